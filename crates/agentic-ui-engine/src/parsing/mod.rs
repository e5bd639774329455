//! # Parsing
//!
//! Markdown source to [`Schema`].
//!
//! Input is split into top-level block segments first (`blocks`), then each
//! segment is built by its rule from the [`RuleSet`], running inline rules
//! over its text (`inline`). Parsing never fails: anything unrecognised is a
//! paragraph of plain text, and unterminated constructs at end of input
//! yield partial nodes.

pub mod blocks;
pub mod cache;
pub mod inline;
pub mod rope;
pub mod rules;
pub mod snapshot;
pub mod streaming;

#[cfg(test)]
mod tests;

use xi_rope::Rope;

use crate::perf::{OperationType, PerformanceMonitor};
use crate::schema::{Node, Schema};

use blocks::{BlockBuilder, MarkdownLineClassifier, segment_nodes};
use rope::{lines_with_spans, slice::slice_to_string};

pub use cache::ParseCache;
pub use rules::{Rule, RuleContext, RuleKind, RuleMatch, RuleSet, TextMatch};
pub use streaming::StreamingParser;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    pub schema: Schema,
}

/// Parses with the standard rules. Pure function of its input.
pub fn parse(markdown: &str) -> ParseResult {
    parse_with_rules(markdown, &RuleSet::shared())
}

pub fn parse_with_rules(markdown: &str, rules: &RuleSet) -> ParseResult {
    ParseResult {
        schema: build_blocks(markdown, rules, None),
    }
}

/// [`parse`] timed as the `parse` phase of paste operation `op_id`.
pub fn parse_for_paste(markdown: &str, monitor: &PerformanceMonitor, op_id: &str) -> ParseResult {
    monitor.start_sub_operation(op_id, OperationType::Parse);
    let result = parse(markdown);
    monitor.end_sub_operation(op_id, OperationType::Parse);
    result
}

pub(crate) fn build_blocks(text: &str, rules: &RuleSet, cache: Option<&mut ParseCache>) -> Vec<Node> {
    parse_rope(&Rope::from(text), rules, cache)
}

/// Segments `rope` and builds nodes, reusing cached segments when given a
/// cache.
pub fn parse_rope(rope: &Rope, rules: &RuleSet, cache: Option<&mut ParseCache>) -> Vec<Node> {
    build_segments(rope, &RuleContext::new(rules), cache)
}

pub(crate) fn build_segments(
    rope: &Rope,
    ctx: &RuleContext<'_>,
    mut cache: Option<&mut ParseCache>,
) -> Vec<Node> {
    let classifier = MarkdownLineClassifier::new(ctx.rules);
    let mut builder = BlockBuilder::new();
    for lr in lines_with_spans(rope) {
        builder.push(&classifier.classify(&lr));
    }
    let blocks = builder.finish();

    let mut schema = Vec::with_capacity(blocks.segments.len());
    for seg in &blocks.segments {
        let Some(cache) = cache.as_deref_mut() else {
            schema.extend(segment_nodes(seg, &blocks.lines, ctx));
            continue;
        };
        let key = ParseCache::key(seg, &slice_to_string(rope, seg.span));
        if let Some(nodes) = cache.get(&key) {
            schema.extend_from_slice(nodes);
            continue;
        }
        log::debug!("building {:?} segment at {:?}", seg.kind, seg.span);
        let nodes = segment_nodes(seg, &blocks.lines, ctx);
        cache.set(key, nodes.clone());
        schema.extend(nodes);
    }
    schema
}
