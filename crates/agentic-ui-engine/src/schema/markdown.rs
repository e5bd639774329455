//! Canonical markdown for a schema.
//!
//! Output re-parses to a structurally equal schema for anything the parser
//! produces itself.

use super::{Align, ElementKind, Node, TextRun};
use crate::parsing::{RuleSet, blocks::MarkdownLineClassifier};

const INLINE_SPECIALS: [char; 6] = ['\\', '*', '`', '~', '[', ']'];

pub fn to_markdown(schema: &[Node]) -> String {
    let blocks: Vec<String> = schema
        .iter()
        .enumerate()
        .map(|(i, node)| block_to_md(node, i == 0))
        .collect();
    blocks.join("\n\n")
}

fn block_to_md(node: &Node, first: bool) -> String {
    let Node::Element(el) = node else {
        return inline_to_md(std::slice::from_ref(node));
    };
    match &el.kind {
        ElementKind::Paragraph => escape_block_starts(&inline_to_md(&el.children)),
        ElementKind::Head { level } => {
            let hashes = "#".repeat(usize::from(*level));
            let text = inline_to_md(&el.children);
            if text.is_empty() {
                hashes
            } else {
                format!("{hashes} {text}")
            }
        }
        ElementKind::List { ordered, start } => list_to_md(&el.children, *ordered, *start),
        ElementKind::ListItem | ElementKind::Task { .. } => {
            list_to_md(std::slice::from_ref(node), false, None)
        }
        ElementKind::Table { aligns } => table_to_md(&el.children, aligns),
        ElementKind::TableRow { .. } | ElementKind::TableCell => inline_to_md(&el.children),
        ElementKind::Code {
            language, value, ..
        } => code_to_md(language.as_deref(), value),
        ElementKind::Blockquote => to_markdown(&el.children)
            .lines()
            .map(|l| if l.is_empty() { ">".to_string() } else { format!("> {l}") })
            .collect::<Vec<_>>()
            .join("\n"),
        ElementKind::Image { url, alt } => format!("![{}]({url})", escape(alt)),
        ElementKind::Link { .. } => inline_to_md(std::slice::from_ref(node)),
        // A leading `---` would open frontmatter.
        ElementKind::Hr if first => "***".to_string(),
        ElementKind::Hr => "---".to_string(),
        ElementKind::Frontmatter { value } => format!("---\n{value}\n---"),
    }
}

/// Paragraph lines that would reparse as a heading, list item, quote, rule or
/// other block get their first punctuation escaped (`\# x`, `1\. x`).
fn escape_block_starts(text: &str) -> String {
    let rules = RuleSet::shared();
    let classifier = MarkdownLineClassifier::new(&rules);
    text.split('\n')
        .map(|line| {
            if !classifier.opens_block(line) {
                return line.to_string();
            }
            match line.find(|c: char| c.is_ascii_punctuation()) {
                Some(at) => format!("{}\\{}", &line[..at], &line[at..]),
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn list_to_md(items: &[Node], ordered: bool, start: Option<u64>) -> String {
    let first_number = start.unwrap_or(1);
    let mut lines = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let mut marker = if ordered {
            format!("{}.", first_number + i as u64)
        } else {
            "-".to_string()
        };
        if let Some(ElementKind::Task { checked }) = item.kind() {
            marker.push_str(if *checked { " [x]" } else { " [ ]" });
        }
        let indent = if ordered {
            " ".repeat(marker.len() + 1)
        } else {
            "  ".to_string()
        };
        let body = item_body_to_md(item.children());
        let mut body_lines = body.split('\n');
        let head = body_lines.next().unwrap_or_default();
        if head.is_empty() {
            lines.push(format!("{marker} "));
        } else {
            lines.push(format!("{marker} {head}"));
        }
        for l in body_lines {
            if l.is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("{indent}{l}"));
            }
        }
    }
    lines.join("\n")
}

fn item_body_to_md(blocks: &[Node]) -> String {
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            let tight = matches!(block.kind(), Some(ElementKind::List { .. }));
            out.push_str(if tight { "\n" } else { "\n\n" });
        }
        out.push_str(&block_to_md(block, false));
    }
    out
}

fn table_to_md(rows: &[Node], aligns: &[Option<Align>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        let cells: Vec<String> = row
            .children()
            .iter()
            .map(|cell| inline_to_md(cell.children()).replace('|', "\\|"))
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
        if i == 0 {
            let delims: Vec<&str> = (0..cells.len())
                .map(|c| match aligns.get(c).copied().flatten() {
                    None => "---",
                    Some(Align::Left) => ":---",
                    Some(Align::Center) => ":---:",
                    Some(Align::Right) => "---:",
                })
                .collect();
            lines.push(format!("| {} |", delims.join(" | ")));
        }
    }
    lines.join("\n")
}

fn code_to_md(language: Option<&str>, value: &str) -> String {
    let longest_tick_run = value
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_tick_run.max(2) + 1);
    let lang = language.unwrap_or_default();
    if value.is_empty() {
        format!("{fence}{lang}\n{fence}")
    } else {
        format!("{fence}{lang}\n{value}\n{fence}")
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Strike,
    Bold,
    Italic,
}

impl Mark {
    fn delimiter(self) -> &'static str {
        match self {
            Mark::Strike => "~~",
            Mark::Bold => "**",
            Mark::Italic => "*",
        }
    }

    fn of(run: &TextRun) -> Vec<Mark> {
        let mut marks = Vec::new();
        if run.strikethrough {
            marks.push(Mark::Strike);
        }
        if run.bold {
            marks.push(Mark::Bold);
        }
        if run.italic {
            marks.push(Mark::Italic);
        }
        marks
    }
}

/// Inline children to markdown, opening and closing mark delimiters around
/// maximal groups of runs that share them.
pub(crate) fn inline_to_md(nodes: &[Node]) -> String {
    let mut out = String::new();
    let mut open: Vec<Mark> = Vec::new();

    for node in nodes {
        let marks = match node {
            Node::Text(run) => Mark::of(run),
            Node::Element(el) => el
                .children
                .first()
                .and_then(Node::as_text)
                .map(Mark::of)
                .unwrap_or_default(),
        };

        // Close down to the longest prefix still wanted.
        let keep = open
            .iter()
            .zip(marks.iter())
            .take_while(|(a, b)| a == b)
            .count();
        while open.len() > keep {
            if let Some(m) = open.pop() {
                out.push_str(m.delimiter());
            }
        }
        for m in &marks[keep..] {
            out.push_str(m.delimiter());
            open.push(*m);
        }

        match node {
            Node::Text(run) if run.code => {
                out.push('`');
                out.push_str(&run.text);
                out.push('`');
            }
            Node::Text(run) => out.push_str(&escape(&run.text)),
            Node::Element(el) => match &el.kind {
                ElementKind::Link { url, title } => {
                    let inner = inline_to_md(&strip_marks(&el.children, &open));
                    match title {
                        Some(t) => out.push_str(&format!("[{inner}]({url} \"{t}\")")),
                        None => out.push_str(&format!("[{inner}]({url})")),
                    }
                }
                ElementKind::Image { url, alt } => {
                    out.push_str(&format!("![{}]({url})", escape(alt)));
                }
                _ => out.push_str(&escape(&node.text_content())),
            },
        }
    }
    while let Some(m) = open.pop() {
        out.push_str(m.delimiter());
    }
    out
}

/// Link children inherit marks from the enclosing group; drop those so they
/// are not emitted twice.
fn strip_marks(nodes: &[Node], open: &[Mark]) -> Vec<Node> {
    nodes
        .iter()
        .map(|n| match n {
            Node::Text(run) => {
                let mut run = run.clone();
                for m in open {
                    match m {
                        Mark::Strike => run.strikethrough = false,
                        Mark::Bold => run.bold = false,
                        Mark::Italic => run.italic = false,
                    }
                }
                Node::Text(run)
            }
            other => other.clone(),
        })
        .collect()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if INLINE_SPECIALS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn nested_marks_group_delimiters() {
        let schema = parse("**a *b* c**").schema;
        assert_eq!(to_markdown(&schema), "**a *b* c**");
    }

    #[test]
    fn escapes_inline_specials() {
        let schema = vec![Node::paragraph(vec![Node::text("2 * 3 [x]")])];
        assert_eq!(to_markdown(&schema), "2 \\* 3 \\[x\\]");
        assert_eq!(parse(&to_markdown(&schema)).schema, schema);
    }

    #[rstest]
    #[case("# x", "\\# x")]
    #[case("- item", "\\- item")]
    #[case("> q", "\\> q")]
    #[case("1. one", "1\\. one")]
    #[case("---", "\\---")]
    #[case("___", "\\___")]
    #[case("a\n# b", "a\n\\# b")]
    #[case("#tag and - dash", "#tag and - dash")]
    fn block_markers_in_paragraphs_are_escaped(#[case] text: &str, #[case] expected: &str) {
        let schema = vec![Node::paragraph(vec![Node::text(text)])];
        let md = to_markdown(&schema);
        assert_eq!(md, expected);
        assert_eq!(parse(&md).schema, schema);
    }

    #[test]
    fn code_fence_grows_past_inner_ticks() {
        let schema = vec![Node::code(None, "```", true)];
        assert_eq!(to_markdown(&schema), "````\n```\n````");
    }

    #[test]
    fn leading_hr_avoids_frontmatter() {
        let schema = vec![
            Node::void(ElementKind::Hr),
            Node::paragraph(vec![Node::text("x")]),
            Node::void(ElementKind::Hr),
        ];
        let md = to_markdown(&schema);
        assert_eq!(md, "***\n\nx\n\n---");
        assert_eq!(parse(&md).schema, schema);
    }
}
