//! # Editing
//!
//! The live, user-editable document and the reconciler that keeps it in step
//! with freshly parsed schemas.
//!
//! ## Structure
//!
//! - **`store`**: [`EditorStore`], the only writer of the live node list.
//!   Structural updates arrive through `update_node_list`/`set_md_content`;
//!   user edits arrive as [`Cmd`]s through `apply`.
//! - **`load`**: chunked `set_md_content_with` support: fence-aware
//!   splitting, progress reporting and a [`CancelHandle`].
//! - **`diff`**: prioritised operations turning the current node list into a
//!   new one while keeping unchanged nodes (and their block keys) in place.
//! - **`selection`**: caret and selection as path + char offset, re-resolved
//!   against the new tree after every change.
//! - **`commands`**: the [`Cmd`] edit vocabulary.
//! - **`table`**: row and column operations on `table` nodes.
//! - **`patch`**: what a change touched, returned to the caller.
//!
//! ## Usage
//!
//! ```rust
//! use agentic_ui_engine::editing::{Cmd, EditorStore, Point, Selection};
//!
//! let mut store = EditorStore::new();
//! store.set_md_content("hello");
//! store.set_selection(Some(Selection::collapsed(Point::new(vec![0, 0], 5))));
//! let patch = store.apply(Cmd::InsertText { text: " world".into() }).unwrap();
//! assert_eq!(store.nodes()[0].text_content(), "hello world");
//! assert_eq!(patch.version, store.version());
//! ```

pub mod commands;
pub mod diff;
pub mod load;
pub mod patch;
pub mod selection;
pub mod store;
pub mod table;

pub use commands::{Cmd, ReplaceOptions};
pub use diff::{Action, Operation, diff};
pub use load::{CancelHandle, LoadOptions, split_chunks};
pub use patch::Patch;
pub use selection::{Point, Selection};
pub use store::{BlockKey, EditorStore, StoreError};
