//! # Inline Parsing
//!
//! Runs the inline rules of a `RuleSet` over a block's text.
//!
//! - **`cursor`**: byte cursor with char-safe advancing
//! - **`kinds`**: opener bytes per construct and escape rules
//! - **`parser`**: `parse_inline` scanning loop
//!
//! Code spans come first in rule order and their body is never re-parsed, so
//! delimiters inside backticks stay literal.

pub mod cursor;
pub mod kinds;
pub mod parser;

pub use cursor::Cursor;
pub use parser::parse_inline;
