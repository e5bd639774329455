use std::sync::Arc;

use xi_rope::Rope;

use crate::perf::{OperationType, PerformanceMonitor};
use crate::schema::Node;

use super::{ParseCache, RuleSet, parse_rope};

/// Parses a growing markdown stream.
///
/// Chunks are appended to a rope and the document is re-segmented on every
/// push; only segments whose source changed (in practice the trailing,
/// still-open block) are rebuilt. The result always equals a full
/// [`parse`](super::parse) of the accumulated text.
pub struct StreamingParser {
    rules: Arc<RuleSet>,
    buffer: Rope,
    cache: ParseCache,
    schema: Vec<Node>,
    monitor: Option<(Arc<PerformanceMonitor>, String)>,
}

impl Default for StreamingParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingParser {
    pub fn new() -> Self {
        Self::with_rules(RuleSet::shared())
    }

    pub fn with_rules(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            buffer: Rope::from(""),
            cache: ParseCache::new(),
            schema: Vec::new(),
            monitor: None,
        }
    }

    /// Reports each reparse as the `parse` phase of operation `op_id`.
    pub fn with_monitor(
        mut self,
        monitor: Arc<PerformanceMonitor>,
        op_id: impl Into<String>,
    ) -> Self {
        self.monitor = Some((monitor, op_id.into()));
        self
    }

    pub fn push_str(&mut self, chunk: &str) -> &[Node] {
        let end = self.buffer.len();
        self.buffer.edit(end..end, chunk);
        self.reparse()
    }

    /// Replaces the whole source. Cached segments shared with the previous
    /// text are still reused.
    pub fn replace(&mut self, text: &str) -> &[Node] {
        self.buffer = Rope::from(text);
        self.reparse()
    }

    pub fn schema(&self) -> &[Node] {
        &self.schema
    }

    pub fn source(&self) -> String {
        self.buffer.slice_to_cow(..).into_owned()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    pub fn cache(&self) -> &ParseCache {
        &self.cache
    }

    pub fn reset(&mut self) {
        self.buffer = Rope::from("");
        self.cache.clear();
        self.schema.clear();
    }

    fn reparse(&mut self) -> &[Node] {
        if let Some((monitor, id)) = &self.monitor {
            monitor.start_sub_operation(id, OperationType::Parse);
        }
        self.cache.begin_pass();
        self.schema = parse_rope(&self.buffer, &self.rules, Some(&mut self.cache));
        self.cache.sweep();
        log::debug!(
            "stream reparse: {} bytes, {} blocks, {} cached",
            self.buffer.len(),
            self.schema.len(),
            self.cache.len()
        );
        if let Some((monitor, id)) = &self.monitor {
            monitor.end_sub_operation(id, OperationType::Parse);
        }
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse;
    use crate::perf::ContentType;
    use pretty_assertions::assert_eq;

    #[test]
    fn chunks_match_full_parse() {
        let md = "# Title\n\nSome **bold** text\n\n```rust\nfn main() {}\n```\n\n- a\n- b\n";
        let mut p = StreamingParser::new();
        for chunk in md.as_bytes().chunks(7) {
            p.push_str(std::str::from_utf8(chunk).unwrap());
        }
        assert_eq!(p.schema(), parse(md).schema.as_slice());
        assert_eq!(p.source(), md);
    }

    #[test]
    fn open_fence_finishes_when_closed() {
        let mut p = StreamingParser::new();
        p.push_str("```js\nlet a;\n");
        assert!(matches!(
            p.schema()[0].kind(),
            Some(crate::schema::ElementKind::Code { finished: false, .. })
        ));
        p.push_str("```\n");
        assert!(matches!(
            p.schema()[0].kind(),
            Some(crate::schema::ElementKind::Code { finished: true, .. })
        ));
    }

    #[test]
    fn cache_tracks_live_segments_only() {
        let mut p = StreamingParser::new();
        p.push_str("one\n\ntwo");
        p.push_str(" more");
        assert_eq!(p.cache().len(), 2);
    }

    #[test]
    fn replace_with_unrelated_text() {
        let mut p = StreamingParser::new();
        p.push_str("# a");
        p.replace("plain");
        assert_eq!(p.schema(), parse("plain").schema.as_slice());
    }

    #[test]
    fn reset_empties_everything() {
        let mut p = StreamingParser::new();
        p.push_str("x");
        p.reset();
        assert!(p.is_empty());
        assert!(p.schema().is_empty());
        assert!(p.cache().is_empty());
    }

    #[test]
    fn reports_parse_phase() {
        let monitor = Arc::new(PerformanceMonitor::with_enabled(true));
        monitor.start_monitoring("stream", ContentType::Text, 3);
        let mut p = StreamingParser::new().with_monitor(Arc::clone(&monitor), "stream");
        p.push_str("abc");
        let sub = monitor.sub_metric("stream", OperationType::Parse).unwrap();
        assert!(sub.duration.is_some());
    }
}
