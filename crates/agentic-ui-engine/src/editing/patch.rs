use crate::editing::Selection;
use crate::schema::NodePath;

/// Result of applying a change to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Paths written by the change, in the order they were applied.
    pub changed: Vec<NodePath>,
    pub new_selection: Option<Selection>,
    pub version: u64,
}

impl Patch {
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }
}
