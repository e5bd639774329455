pub mod block_quote;
pub mod code_fence;
pub mod frontmatter;
pub mod list;
pub mod table;

pub use block_quote::BlockQuote;
pub use code_fence::{CodeFence, FenceKind, FenceSig};
pub use frontmatter::Frontmatter;
pub use list::ListMarker;
pub use table::Table;
