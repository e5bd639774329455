use crate::parsing::rules::{RuleContext, RuleMatch};
use crate::schema::{Node, merge_text_runs};

use super::{
    cursor::Cursor,
    kinds::{Delimiters, Escape},
};

/// Parses inline content into text runs and inline elements.
///
/// At each position the inline rules whose opener byte matches are tried in
/// table order; the first match wins and its `run` builds the nodes (marks
/// recurse into the match body). Everything else accumulates as plain text.
/// A backslash before ASCII punctuation makes that character literal.
pub fn parse_inline(s: &str, ctx: &RuleContext<'_>) -> Vec<Node> {
    let mut cur = Cursor::new(s);
    let mut out = vec![];
    let mut text = String::new();

    fn flush_text(out: &mut Vec<Node>, text: &mut String) {
        if !text.is_empty() {
            out.push(Node::text(std::mem::take(text)));
        }
    }

    while !cur.eof() {
        if cur.peek() == Some(Escape::BACKSLASH)
            && let Some(next) = cur.peek_at(1)
            && Escape::is_escapable(next)
        {
            text.push(char::from(next));
            cur.bump_n(2);
            continue;
        }
        if let Some(nodes) = try_rules(&mut cur, ctx) {
            flush_text(&mut out, &mut text);
            out.extend(nodes);
            continue;
        }
        if let Some(c) = cur.bump_char() {
            text.push(c);
        }
    }

    flush_text(&mut out, &mut text);
    merge_text_runs(out)
}

fn try_rules(cur: &mut Cursor<'_>, ctx: &RuleContext<'_>) -> Option<Vec<Node>> {
    let b = cur.peek()?;
    let rest = cur.rest();
    for rule in ctx.rules.inline_rules() {
        if Delimiters::opener(rule.kind) != Some(b) {
            continue;
        }
        let Some(caps) = rule.captures(rest) else {
            continue;
        };
        let len = caps.get(0).map_or(0, |m| m.end());
        if len == 0 {
            continue;
        }
        let nodes = (rule.run)(
            &RuleMatch {
                caps,
                source: &rest[..len],
                finished: true,
            },
            ctx,
        );
        cur.bump_n(len);
        return Some(nodes);
    }
    None
}
