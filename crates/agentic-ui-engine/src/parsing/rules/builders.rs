//! `run` functions for the standard rules.

use super::{Fragment, RuleContext, RuleMatch};
use crate::parsing::blocks::kinds::{CodeFence, Table};
use crate::schema::{ElementKind, Node, TextRun};

fn group<'t>(m: &RuleMatch<'t>, i: usize) -> &'t str {
    m.caps.get(i).map_or("", |g| g.as_str())
}

/// Lines between the opening and (if seen) closing delimiter lines.
fn body_lines<'t>(source: &'t str, finished: bool) -> Vec<&'t str> {
    let mut lines: Vec<&str> = source.lines().skip(1).collect();
    if finished {
        lines.pop();
    }
    lines
}

/// Containers need at least one child block to host the caret.
fn non_empty_blocks(blocks: Vec<Node>) -> Vec<Node> {
    if blocks.is_empty() {
        vec![Node::paragraph(vec![Node::text("")])]
    } else {
        blocks
    }
}

pub fn run_frontmatter(m: &RuleMatch<'_>, _ctx: &RuleContext<'_>) -> Fragment {
    let value = body_lines(m.source, m.finished).join("\n");
    vec![Node::element(
        ElementKind::Frontmatter {
            value: value.clone(),
        },
        vec![Node::text(value)],
    )]
}

pub fn run_code(m: &RuleMatch<'_>, _ctx: &RuleContext<'_>) -> Fragment {
    let fence = group(m, 1);
    let language = if fence == CodeFence::MATH_DELIMITER {
        Some("katex".to_string())
    } else {
        CodeFence::language(group(m, 2))
    };
    let value = body_lines(m.source, m.finished).join("\n");
    vec![Node::code(language, value, m.finished)]
}

pub fn run_hr(_m: &RuleMatch<'_>, _ctx: &RuleContext<'_>) -> Fragment {
    vec![Node::void(ElementKind::Hr)]
}

pub fn run_table(m: &RuleMatch<'_>, ctx: &RuleContext<'_>) -> Fragment {
    let mut lines = m.source.lines();
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let header = Table::split_cells(header_line);
    let width = header.len();

    let mut aligns = vec![None; width];
    let mut body: Vec<Vec<String>> = Vec::new();
    for (i, line) in lines.enumerate() {
        if i == 0
            && let Some(declared) = Table::parse_delimiter(line)
        {
            for (slot, align) in aligns.iter_mut().zip(declared) {
                *slot = align;
            }
            continue;
        }
        body.push(Table::normalize_row(Table::split_cells(line), width));
    }
    Table::infer_numeric_alignment(&mut aligns, &body);

    let row = |cells: &[String], header: bool| {
        Node::element(
            ElementKind::TableRow { header },
            cells
                .iter()
                .map(|c| Node::element(ElementKind::TableCell, ctx.inline(c)))
                .collect(),
        )
    };
    let mut rows = vec![row(&header, true)];
    rows.extend(body.iter().map(|cells| row(cells, false)));
    vec![Node::element(ElementKind::Table { aligns }, rows)]
}

pub fn run_head(m: &RuleMatch<'_>, ctx: &RuleContext<'_>) -> Fragment {
    let level = u8::try_from(group(m, 1).len()).unwrap_or(6);
    vec![Node::element(
        ElementKind::Head { level },
        ctx.inline(m.source),
    )]
}

pub fn run_task(m: &RuleMatch<'_>, ctx: &RuleContext<'_>) -> Fragment {
    let checked = !group(m, 3).trim().is_empty();
    vec![Node::element(
        ElementKind::Task { checked },
        non_empty_blocks(ctx.blocks(m.source)),
    )]
}

pub fn run_list(m: &RuleMatch<'_>, ctx: &RuleContext<'_>) -> Fragment {
    vec![Node::element(
        ElementKind::ListItem,
        non_empty_blocks(ctx.blocks(m.source)),
    )]
}

pub fn run_blockquote(m: &RuleMatch<'_>, ctx: &RuleContext<'_>) -> Fragment {
    vec![Node::element(
        ElementKind::Blockquote,
        non_empty_blocks(ctx.blocks(m.source)),
    )]
}

pub fn run_inline_code(m: &RuleMatch<'_>, _ctx: &RuleContext<'_>) -> Fragment {
    vec![Node::Text(TextRun {
        text: group(m, 1).to_string(),
        code: true,
        ..TextRun::default()
    })]
}

/// Applies `mark` to every text run below `nodes`, links included.
fn marked(nodes: Vec<Node>, mark: fn(&mut TextRun)) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::Text(mut run) => {
                mark(&mut run);
                Node::Text(run)
            }
            Node::Element(mut el) => {
                el.children = marked(el.children, mark);
                Node::Element(el)
            }
        })
        .collect()
}

pub fn run_bold_and_italic(m: &RuleMatch<'_>, ctx: &RuleContext<'_>) -> Fragment {
    marked(ctx.inline(group(m, 1)), |r| {
        r.bold = true;
        r.italic = true;
    })
}

pub fn run_bold(m: &RuleMatch<'_>, ctx: &RuleContext<'_>) -> Fragment {
    marked(ctx.inline(group(m, 1)), |r| r.bold = true)
}

pub fn run_italic(m: &RuleMatch<'_>, ctx: &RuleContext<'_>) -> Fragment {
    marked(ctx.inline(group(m, 1)), |r| r.italic = true)
}

pub fn run_strikethrough(m: &RuleMatch<'_>, ctx: &RuleContext<'_>) -> Fragment {
    marked(ctx.inline(group(m, 1)), |r| r.strikethrough = true)
}

pub fn run_img(m: &RuleMatch<'_>, _ctx: &RuleContext<'_>) -> Fragment {
    vec![Node::void(ElementKind::Image {
        url: group(m, 2).to_string(),
        alt: group(m, 1).to_string(),
    })]
}

pub fn run_link(m: &RuleMatch<'_>, ctx: &RuleContext<'_>) -> Fragment {
    let title = m.caps.get(3).map(|t| t.as_str().to_string());
    vec![Node::element(
        ElementKind::Link {
            url: group(m, 2).to_string(),
            title,
        },
        ctx.inline(group(m, 1)),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::rules::{RuleKind, RuleSet};
    use pretty_assertions::assert_eq;

    fn run(kind: RuleKind, text: &str) -> Fragment {
        let rules = RuleSet::standard();
        let rule = rules.get(kind).unwrap();
        let caps = rule.captures(text).unwrap();
        let source = kind
            .content_group()
            .map(|g| caps.get(g).map_or("", |m| m.as_str()))
            .unwrap_or(text);
        (rule.run)(
            &RuleMatch {
                caps,
                source,
                finished: true,
            },
            &RuleContext::new(&rules),
        )
    }

    #[test]
    fn empty_heading_keeps_a_text_child() {
        assert_eq!(
            run(RuleKind::Head, "###"),
            vec![Node::element(
                ElementKind::Head { level: 3 },
                vec![Node::text("")]
            )]
        );
    }

    #[test]
    fn link_children_carry_marks() {
        let nodes = run(RuleKind::Bold, "**[a](u)**");
        assert_eq!(
            nodes,
            vec![Node::element(
                ElementKind::Link {
                    url: "u".into(),
                    title: None
                },
                vec![Node::Text(TextRun {
                    text: "a".into(),
                    bold: true,
                    ..TextRun::default()
                })]
            )]
        );
    }

    #[test]
    fn link_title_is_optional() {
        let nodes = run(RuleKind::Link, "[a](u \"T\")");
        assert_eq!(
            nodes[0].kind(),
            Some(&ElementKind::Link {
                url: "u".into(),
                title: Some("T".into())
            })
        );
    }

    #[test]
    fn task_checked_state() {
        let nodes = run(RuleKind::Task, "- [X] done");
        assert_eq!(nodes[0].kind(), Some(&ElementKind::Task { checked: true }));
        assert_eq!(nodes[0].text_content(), "done");
    }
}
