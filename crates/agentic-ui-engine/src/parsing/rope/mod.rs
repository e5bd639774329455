//! Rope access helpers: byte spans, line iteration and slicing.
//!
//! The streaming parser keeps its accumulated source in an `xi_rope::Rope`
//! so appends of model output chunks stay cheap on long transcripts.

pub mod lines;
pub mod slice;
pub mod span;

pub use lines::{LineRef, lines_with_spans};
pub use slice::{preview, slice_to_string};
pub use span::Span;
