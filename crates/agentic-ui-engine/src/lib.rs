pub mod editing;
pub mod io;
pub mod lazy;
pub mod models;
pub mod parsing;
pub mod perf;
pub mod schema;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use editing::{Cmd, EditorStore, Patch, Point, ReplaceOptions, Selection, StoreError};
pub use io::*;
pub use lazy::{LazyConfig, LazyError, LazyList, Render, RootMargin};
pub use models::*;
pub use parsing::{ParseResult, RuleSet, StreamingParser, parse};
pub use perf::{PerformanceMonitor, measure, performance_monitor, with_performance_monitoring};
pub use schema::{ElementKind, Node, Schema, TextRun, to_html, to_markdown};
