use std::fmt::Write;

use crate::schema::{ElementKind, Node, TextRun};

/// One line per node, children indented two spaces.
///
/// Elements print their type and metadata; text runs print their quoted
/// text followed by their marks in brackets.
pub fn normalize(schema: &[Node]) -> String {
    let mut out = String::new();
    for node in schema {
        write_node(&mut out, node, 0);
    }
    out
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    let pad = "  ".repeat(depth);
    match node {
        Node::Text(run) => {
            let _ = writeln!(out, "{pad}{:?}{}", run.text, marks(run));
        }
        Node::Element(el) => {
            let _ = writeln!(out, "{pad}{}{}", el.kind.type_name(), attrs(&el.kind));
            // Code and frontmatter repeat their value as the only child.
            if matches!(
                el.kind,
                ElementKind::Code { .. } | ElementKind::Frontmatter { .. }
            ) {
                return;
            }
            for child in &el.children {
                write_node(out, child, depth + 1);
            }
        }
    }
}

fn marks(run: &TextRun) -> String {
    let names: Vec<&str> = [
        (run.bold, "bold"),
        (run.italic, "italic"),
        (run.strikethrough, "strike"),
        (run.code, "code"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();
    if names.is_empty() {
        String::new()
    } else {
        format!(" [{}]", names.join(" "))
    }
}

fn attrs(kind: &ElementKind) -> String {
    match kind {
        ElementKind::Head { level } => format!(" level={level}"),
        ElementKind::List { ordered, start } => match start {
            Some(n) => format!(" ordered={ordered} start={n}"),
            None => format!(" ordered={ordered}"),
        },
        ElementKind::Task { checked } => format!(" checked={checked}"),
        ElementKind::Table { aligns } => {
            let a: Vec<&str> = aligns
                .iter()
                .map(|a| a.map_or("-", |a| a.as_str()))
                .collect();
            format!(" aligns=[{}]", a.join(","))
        }
        ElementKind::TableRow { header: true } => " header".to_string(),
        ElementKind::Code {
            language,
            value,
            katex,
            finished,
        } => format!(
            " lang={} katex={katex} finished={finished} value={value:?}",
            language.as_deref().unwrap_or("-")
        ),
        ElementKind::Image { url, alt } => format!(" url={url:?} alt={alt:?}"),
        ElementKind::Link { url, title } => match title {
            Some(t) => format!(" url={url:?} title={t:?}"),
            None => format!(" url={url:?}"),
        },
        ElementKind::Frontmatter { value } => format!(" value={value:?}"),
        _ => String::new(),
    }
}
