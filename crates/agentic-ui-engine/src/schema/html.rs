use html_escape::{encode_double_quoted_attribute, encode_text};

use super::{ElementKind, Node, TextRun};

/// Minimal HTML for a schema, one top-level block per line.
pub fn to_html(schema: &[Node]) -> String {
    schema.iter().map(node_to_html).collect::<Vec<_>>().join("\n")
}

fn children_html(nodes: &[Node]) -> String {
    nodes.iter().map(node_to_html).collect()
}

fn node_to_html(node: &Node) -> String {
    let el = match node {
        Node::Text(run) => return run_to_html(run),
        Node::Element(el) => el,
    };
    let inner = || children_html(&el.children);
    match &el.kind {
        ElementKind::Paragraph => format!("<p>{}</p>", inner()),
        ElementKind::Head { level } => format!("<h{level}>{}</h{level}>", inner()),
        ElementKind::List { ordered: true, start } => match start {
            Some(n) if *n != 1 => format!("<ol start=\"{n}\">{}</ol>", inner()),
            _ => format!("<ol>{}</ol>", inner()),
        },
        ElementKind::List { ordered: false, .. } => format!("<ul>{}</ul>", inner()),
        ElementKind::ListItem => format!("<li>{}</li>", inner()),
        ElementKind::Task { checked } => {
            let attr = if *checked { " checked" } else { "" };
            format!(
                "<li class=\"task\"><input type=\"checkbox\" disabled{attr}>{}</li>",
                inner()
            )
        }
        ElementKind::Table { aligns } => {
            let rows: String = el
                .children
                .iter()
                .map(|row| {
                    let header = matches!(row.kind(), Some(ElementKind::TableRow { header: true }));
                    let tag = if header { "th" } else { "td" };
                    let cells: String = row
                        .children()
                        .iter()
                        .enumerate()
                        .map(|(c, cell)| match aligns.get(c).copied().flatten() {
                            Some(a) => format!(
                                "<{tag} align=\"{}\">{}</{tag}>",
                                a.as_str(),
                                children_html(cell.children())
                            ),
                            None => format!("<{tag}>{}</{tag}>", children_html(cell.children())),
                        })
                        .collect();
                    format!("<tr>{cells}</tr>")
                })
                .collect();
            format!("<table>{rows}</table>")
        }
        ElementKind::TableRow { .. } => format!("<tr>{}</tr>", inner()),
        ElementKind::TableCell => format!("<td>{}</td>", inner()),
        ElementKind::Code {
            language,
            value,
            katex,
            ..
        } => {
            if *katex {
                format!("<div class=\"katex\">{}</div>", encode_text(value))
            } else {
                match language {
                    Some(lang) => format!(
                        "<pre><code class=\"language-{}\">{}</code></pre>",
                        encode_double_quoted_attribute(lang),
                        encode_text(value)
                    ),
                    None => format!("<pre><code>{}</code></pre>", encode_text(value)),
                }
            }
        }
        ElementKind::Blockquote => format!("<blockquote>{}</blockquote>", inner()),
        ElementKind::Image { url, alt } => format!(
            "<img src=\"{}\" alt=\"{}\">",
            encode_double_quoted_attribute(url),
            encode_double_quoted_attribute(alt)
        ),
        ElementKind::Link { url, title } => match title {
            Some(t) => format!(
                "<a href=\"{}\" title=\"{}\">{}</a>",
                encode_double_quoted_attribute(url),
                encode_double_quoted_attribute(t),
                inner()
            ),
            None => format!(
                "<a href=\"{}\">{}</a>",
                encode_double_quoted_attribute(url),
                inner()
            ),
        },
        ElementKind::Hr => "<hr>".to_string(),
        ElementKind::Frontmatter { .. } => String::new(),
    }
}

fn run_to_html(run: &TextRun) -> String {
    let mut html = encode_text(&run.text).replace('\n', "<br>");
    if run.code {
        html = format!("<code>{html}</code>");
    }
    if run.italic {
        html = format!("<em>{html}</em>");
    }
    if run.bold {
        html = format!("<strong>{html}</strong>");
    }
    if run.strikethrough {
        html = format!("<del>{html}</del>");
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse;
    use insta::assert_snapshot;

    #[test]
    fn renders_marks_and_escapes() {
        let schema = parse("***a*** & `<b>`").schema;
        assert_snapshot!(
            to_html(&schema),
            @"<p><strong><em>a</em></strong> &amp; <code>&lt;b&gt;</code></p>"
        );
    }

    #[test]
    fn renders_aligned_tables() {
        let schema = parse("| a | b |\n| :-- | --: |\n| 1 | 2 |").schema;
        assert_eq!(
            to_html(&schema),
            "<table><tr><th align=\"left\">a</th><th align=\"right\">b</th></tr>\
             <tr><td align=\"left\">1</td><td align=\"right\">2</td></tr></table>"
        );
    }

    #[test]
    fn katex_code_is_not_highlighted() {
        let schema = parse("$$\nx^2\n$$").schema;
        assert_eq!(to_html(&schema), "<div class=\"katex\">x^2</div>");
    }

    #[test]
    fn frontmatter_renders_nothing() {
        let schema = parse("---\ntitle: x\n---\n\nbody").schema;
        assert_eq!(to_html(&schema), "\n<p>body</p>");
    }
}
