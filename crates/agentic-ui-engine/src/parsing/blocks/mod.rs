//! # Block Parsing
//!
//! Two-phase block parsing.
//!
//! ## Parsing Phases
//!
//! 1. **Line Classification** (`classify`): each line becomes a `LineClass`
//!    holding local facts (indentation, blank status, what it could open).
//!
//! 2. **Segmentation** (`builder`): a `BlockBuilder` state machine groups
//!    lines into top-level [`Segment`]s as blocks open and close.
//!
//! 3. **Node construction** (`nodes`, `lists`): each segment is handed to its
//!    rule's `run`, recursing for blockquote and list item bodies.
//!
//! ## Modules
//!
//! - **`types`**: `Segment`, `SegmentKind`, `LineOpener`
//! - **`kinds`**: block-specific delimiter knowledge (fences, quotes, tables,
//!   list markers, frontmatter)
//! - **`classify`**: `MarkdownLineClassifier`
//! - **`builder`**: `BlockBuilder`
//!
//! ## Key Invariants
//!
//! - Fenced code and frontmatter are raw zones: no block or inline parsing
//!   inside
//! - Segment spans tile their lines exactly, terminators included
//! - Segments only depend on their own lines, so their nodes can be cached by
//!   source text

pub mod builder;
pub mod classify;
pub mod kinds;
pub mod lists;
pub mod nodes;
pub mod types;

pub use builder::{BlockBuilder, Blocks};
pub use classify::{LineClass, MarkdownLineClassifier};
pub use nodes::segment_nodes;
pub use types::{LineOpener, Segment, SegmentKind};
