//! Schema to terminal lines.

use agentic_ui_engine::schema::{ElementKind, Node, TextRun};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

pub fn schema_lines(schema: &[Node]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, node) in schema.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        block_lines(node, "", &mut lines);
    }
    lines
}

fn run_style(run: &TextRun) -> Style {
    let mut style = Style::default();
    if run.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if run.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if run.strikethrough {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    if run.code {
        style = style.fg(Color::Yellow);
    }
    style
}

fn inline_spans(children: &[Node], base: Style, spans: &mut Vec<Span<'static>>) {
    for child in children {
        match child {
            Node::Text(run) => spans.push(Span::styled(run.text.clone(), base.patch(run_style(run)))),
            Node::Element(e) => {
                let style = match &e.kind {
                    ElementKind::Link { .. } => base
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                    _ => base,
                };
                inline_spans(&e.children, style, spans);
            }
        }
    }
}

/// Text runs may hold line breaks; each becomes its own terminal line.
fn push_inline(prefix: &str, children: &[Node], base: Style, lines: &mut Vec<Line<'static>>) {
    let mut spans = Vec::new();
    inline_spans(children, base, &mut spans);

    let mut current = vec![Span::raw(prefix.to_string())];
    for span in spans {
        let style = span.style;
        let mut parts = span.content.split('\n').peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() {
                current.push(Span::styled(part.to_string(), style));
            }
            if parts.peek().is_some() {
                lines.push(Line::from(std::mem::take(&mut current)));
                current.push(Span::raw(prefix.to_string()));
            }
        }
    }
    lines.push(Line::from(current));
}

fn block_lines(node: &Node, prefix: &str, lines: &mut Vec<Line<'static>>) {
    let Node::Element(element) = node else {
        push_inline(prefix, std::slice::from_ref(node), Style::default(), lines);
        return;
    };
    let children = &element.children;
    match &element.kind {
        ElementKind::Head { level } => {
            let marker = format!("{prefix}{} ", "#".repeat(usize::from(*level)));
            let style = Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD);
            push_inline(&marker, children, style, lines);
        }
        ElementKind::Paragraph | ElementKind::ListItem | ElementKind::TableCell => {
            push_inline(prefix, children, Style::default(), lines);
        }
        ElementKind::List { ordered, start } => {
            let mut number = start.unwrap_or(1);
            for item in children {
                let marker = match item.kind() {
                    Some(ElementKind::Task { checked: true }) => "[x] ".to_string(),
                    Some(ElementKind::Task { checked: false }) => "[ ] ".to_string(),
                    _ if *ordered => format!("{number}. "),
                    _ => "• ".to_string(),
                };
                number += 1;
                list_item_lines(item, prefix, &marker, lines);
            }
        }
        ElementKind::Task { checked } => {
            let marker = if *checked { "[x] " } else { "[ ] " };
            list_item_lines(node, prefix, marker, lines);
        }
        ElementKind::Table { .. } => {
            for row in children {
                let header = matches!(row.kind(), Some(ElementKind::TableRow { header: true }));
                let cells: Vec<String> = row.children().iter().map(Node::text_content).collect();
                let style = if header {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                lines.push(Line::from(vec![
                    Span::raw(prefix.to_string()),
                    Span::styled(format!("│ {} │", cells.join(" │ ")), style),
                ]));
                if header {
                    let rule = cells
                        .iter()
                        .map(|c| "─".repeat(c.chars().count().max(3)))
                        .collect::<Vec<_>>()
                        .join("─┼─");
                    lines.push(Line::raw(format!("{prefix}├─{rule}─┤")));
                }
            }
        }
        ElementKind::TableRow { .. } => {
            let cells: Vec<String> = children.iter().map(Node::text_content).collect();
            lines.push(Line::raw(format!("{prefix}│ {} │", cells.join(" │ "))));
        }
        ElementKind::Code {
            language,
            value,
            katex,
            finished,
        } => {
            let dim = Style::default().add_modifier(Modifier::DIM);
            let fence = if *katex { "∑" } else { "```" };
            lines.push(Line::styled(
                format!("{prefix}{fence}{}", language.as_deref().unwrap_or_default()),
                dim,
            ));
            for line in value.lines() {
                lines.push(Line::styled(format!("{prefix}{line}"), Style::default().fg(Color::Green)));
            }
            if *finished {
                lines.push(Line::styled(format!("{prefix}{fence}"), dim));
            }
        }
        ElementKind::Blockquote => {
            let nested = format!("{prefix}│ ");
            for child in children {
                block_lines(child, &nested, lines);
            }
        }
        ElementKind::Image { url, alt } => {
            lines.push(Line::styled(
                format!("{prefix}[image: {alt}]({url})"),
                Style::default().fg(Color::Magenta),
            ));
        }
        ElementKind::Link { .. } => push_inline(prefix, std::slice::from_ref(node), Style::default(), lines),
        ElementKind::Hr => lines.push(Line::raw(format!("{prefix}{}", "─".repeat(24)))),
        ElementKind::Frontmatter { value } => {
            let dim = Style::default().add_modifier(Modifier::DIM);
            for line in value.lines() {
                lines.push(Line::styled(format!("{prefix}{line}"), dim));
            }
        }
    }
}

/// The item's first paragraph (or its leading inline runs) shares the
/// marker line; nested blocks are indented under it.
fn list_item_lines(item: &Node, prefix: &str, marker: &str, lines: &mut Vec<Line<'static>>) {
    let indent = format!("{prefix}{}", " ".repeat(marker.chars().count()));
    let children = item.children();
    let is_inline = |c: &Node| c.is_text() || matches!(c.kind(), Some(ElementKind::Link { .. }));
    let (first, rest) = match children.split_first() {
        Some((first, rest)) if matches!(first.kind(), Some(ElementKind::Paragraph)) => {
            (first.children(), rest)
        }
        _ => {
            let split = children.iter().take_while(|c| is_inline(*c)).count();
            children.split_at(split)
        }
    };
    push_inline(&format!("{prefix}{marker}"), first, Style::default(), lines);
    for child in rest {
        match child.kind() {
            Some(ElementKind::Paragraph) => {
                push_inline(&indent, child.children(), Style::default(), lines)
            }
            _ => block_lines(child, &indent, lines),
        }
    }
}
