//! # Lazy rendering
//!
//! Decides, per item of a long bubble list, whether to draw real content or
//! a placeholder of known height. See [`LazyList`] for the lifecycle.

pub mod config;
pub mod list;
pub mod margin;

pub use config::{LazyConfig, LazyPredicate, PlaceholderInfo, PlaceholderRenderer};
pub use list::{LazyEntry, LazyList, Render, Viewport};
pub use margin::{Length, RootMargin};

#[derive(Debug, thiserror::Error)]
pub enum LazyError {
    #[error("Invalid root margin {0:?}: expected one to four lengths in px or %")]
    InvalidMargin(String),
}
