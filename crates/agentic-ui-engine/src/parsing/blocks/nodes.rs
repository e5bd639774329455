use crate::parsing::rules::{RuleContext, RuleKind, RuleMatch};
use crate::schema::{ElementKind, Node};

use super::{
    classify::LineClass,
    kinds::BlockQuote,
    lists,
    types::{Segment, SegmentKind},
};

/// Schema nodes for one segment.
pub fn segment_nodes(seg: &Segment, lines: &[LineClass], ctx: &RuleContext<'_>) -> Vec<Node> {
    let texts: Vec<&str> = lines[seg.lines.clone()]
        .iter()
        .map(|l| l.text.as_str())
        .collect();
    let Some(first) = texts.first().copied() else {
        return vec![];
    };

    let built = match seg.kind {
        SegmentKind::Paragraph => return paragraph(&texts, ctx),
        SegmentKind::List => return lists::assemble(&texts, ctx),
        SegmentKind::Heading => run_line(RuleKind::Head, first, ctx),
        SegmentKind::ThematicBreak => run_block(RuleKind::Hr, first, first, true, ctx),
        SegmentKind::Code => run_block(RuleKind::Code, first, &texts.join("\n"), seg.finished, ctx),
        SegmentKind::Frontmatter => run_block(
            RuleKind::Frontmatter,
            first,
            &texts.join("\n"),
            seg.finished,
            ctx,
        ),
        SegmentKind::Table => run_block(RuleKind::Table, first, &texts.join("\n"), true, ctx),
        SegmentKind::Quote => {
            let inner = texts
                .iter()
                .map(|t| BlockQuote::strip_one(t).unwrap_or(t.trim_start()))
                .collect::<Vec<_>>()
                .join("\n");
            run_block(RuleKind::Blockquote, first, &inner, true, ctx)
        }
    };
    built.unwrap_or_else(|| paragraph(&texts, ctx))
}

fn paragraph(texts: &[&str], ctx: &RuleContext<'_>) -> Vec<Node> {
    let joined = texts
        .iter()
        .map(|t| t.trim())
        .collect::<Vec<_>>()
        .join("\n");
    let inline = ctx.inline(&joined);
    // A paragraph holding only an image is a block image.
    if let [only] = inline.as_slice()
        && matches!(only.kind(), Some(ElementKind::Image { .. }))
    {
        return inline;
    }
    vec![Node::paragraph(inline)]
}

fn run_line(kind: RuleKind, line: &str, ctx: &RuleContext<'_>) -> Option<Vec<Node>> {
    let rule = ctx.rules.get(kind)?;
    let caps = rule.captures(line)?;
    let source = kind
        .content_group()
        .and_then(|g| caps.get(g))
        .map_or("", |m| m.as_str());
    Some((rule.run)(
        &RuleMatch {
            caps,
            source,
            finished: true,
        },
        ctx,
    ))
}

/// Runs a rule whose opener is `opener` with `source` as its body.
fn run_block(
    kind: RuleKind,
    opener: &str,
    source: &str,
    finished: bool,
    ctx: &RuleContext<'_>,
) -> Option<Vec<Node>> {
    let rule = ctx.rules.get(kind)?;
    let caps = rule.captures(opener)?;
    Some((rule.run)(
        &RuleMatch {
            caps,
            source,
            finished,
        },
        ctx,
    ))
}
