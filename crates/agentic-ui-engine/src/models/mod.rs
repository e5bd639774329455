pub mod conversation;

pub use conversation::{Bubble, Conversation, Placement, Role};
