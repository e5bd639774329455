//! # Snapshot Testing Support
//!
//! - **`normalize`**: renders a schema as an indented text tree for `insta`
//!   snapshots
//! - **`invariants`**: structural checks every parser output must pass
//!   (elements have children, tables are rectangular, lists hold items)

pub mod invariants;
pub mod normalize;

pub use invariants::check as invariants;
pub use normalize::normalize;
