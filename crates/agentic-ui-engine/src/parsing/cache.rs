use std::collections::HashMap;

use crate::parsing::blocks::Segment;
use crate::schema::Node;

#[derive(Debug, Clone)]
struct Entry {
    nodes: Vec<Node>,
    generation: u64,
}

/// Nodes of previously built segments, keyed by segment kind and source.
///
/// A segment's nodes depend only on its own text, so an unchanged segment
/// can be reused verbatim. Entries not touched during a pass are dropped by
/// [`ParseCache::sweep`], which bounds the cache to the live document.
#[derive(Debug, Default, Clone)]
pub struct ParseCache {
    entries: HashMap<String, Entry>,
    generation: u64,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(segment: &Segment, source: &str) -> String {
        format!("{:?}:{}\u{0}{source}", segment.kind, segment.finished)
    }

    /// Looks up `key`, marking it live for the current pass.
    pub fn get(&mut self, key: &str) -> Option<&[Node]> {
        let generation = self.generation;
        let entry = self.entries.get_mut(key)?;
        entry.generation = generation;
        Some(&entry.nodes)
    }

    pub fn set(&mut self, key: String, nodes: Vec<Node>) {
        let generation = self.generation;
        self.entries.insert(key, Entry { nodes, generation });
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn begin_pass(&mut self) {
        self.generation += 1;
    }

    /// Drops entries not used since [`ParseCache::begin_pass`].
    pub fn sweep(&mut self) {
        let generation = self.generation;
        self.entries.retain(|_, e| e.generation == generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::blocks::SegmentKind;
    use crate::parsing::rope::Span;

    fn seg() -> Segment {
        Segment {
            kind: SegmentKind::Paragraph,
            span: Span::new(0, 1),
            lines: 0..1,
            finished: true,
        }
    }

    #[test]
    fn get_set_contains() {
        let mut cache = ParseCache::new();
        let key = ParseCache::key(&seg(), "a");
        assert!(!cache.contains(&key));
        cache.set(key.clone(), vec![Node::text("a")]);
        assert!(cache.contains(&key));
        assert_eq!(cache.get(&key), Some(&[Node::text("a")][..]));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn sweep_drops_untouched_entries() {
        let mut cache = ParseCache::new();
        cache.begin_pass();
        cache.set("old".into(), vec![]);
        cache.set("kept".into(), vec![]);
        cache.begin_pass();
        assert!(cache.get("kept").is_some());
        cache.sweep();
        assert!(cache.contains("kept"));
        assert!(!cache.contains("old"));
    }

    #[test]
    fn key_separates_kinds() {
        let mut heading = seg();
        heading.kind = SegmentKind::Heading;
        assert_ne!(ParseCache::key(&seg(), "x"), ParseCache::key(&heading, "x"));
    }
}
