//! Turns a list segment into `list` nodes.
//!
//! Items start at marker lines indented less than the first marker plus
//! [`ListMarker::NEST_INDENT`]. Every other line belongs to the item above,
//! de-indented by at most the item's content column, and the item body is
//! parsed recursively, which is what nests deeper lists.

use crate::parsing::rules::{RuleContext, RuleKind, RuleMatch};
use crate::schema::{ElementKind, Node};

use super::kinds::ListMarker;

struct ItemDraft<'a> {
    first: &'a str,
    rest: Vec<&'a str>,
    content_indent: usize,
    number: Option<u64>,
}

pub fn assemble(lines: &[&str], ctx: &RuleContext<'_>) -> Vec<Node> {
    let base = lines.first().map_or(0, |l| ListMarker::indent_width(l));
    let mut drafts: Vec<ItemDraft<'_>> = Vec::new();

    for line in lines {
        let indent = ListMarker::indent_width(line);
        if indent < base + ListMarker::NEST_INDENT
            && let Some(draft) = open_item(line, ctx)
        {
            drafts.push(draft);
            continue;
        }
        if let Some(d) = drafts.last_mut() {
            d.rest.push(ListMarker::strip_indent(line, d.content_indent));
        }
    }

    let mut lists: Vec<Node> = Vec::new();
    let mut current: Option<(bool, Option<u64>, Vec<Node>)> = None;
    for d in &drafts {
        let ordered = d.number.is_some();
        let item = build_item(d, ctx);
        match current.as_mut() {
            Some((o, _, items)) if *o == ordered => items.extend(item),
            _ => {
                if let Some((ordered, start, items)) = current.take() {
                    lists.push(Node::element(ElementKind::List { ordered, start }, items));
                }
                current = Some((ordered, d.number, item));
            }
        }
    }
    if let Some((ordered, start, items)) = current {
        lists.push(Node::element(ElementKind::List { ordered, start }, items));
    }
    lists
}

fn open_item<'a>(line: &'a str, ctx: &RuleContext<'_>) -> Option<ItemDraft<'a>> {
    let caps = [RuleKind::List, RuleKind::Task]
        .into_iter()
        .filter_map(|k| ctx.rules.get(k))
        .find_map(|r| r.captures(line))?;
    let marker = caps.get(2)?.as_str();
    Some(ItemDraft {
        first: line,
        rest: Vec::new(),
        content_indent: ListMarker::indent_width(line) + marker.len() + 1,
        number: ListMarker::number(marker),
    })
}

fn build_item(d: &ItemDraft<'_>, ctx: &RuleContext<'_>) -> Vec<Node> {
    let mut rest = d.rest.clone();
    while rest.last().is_some_and(|l| l.trim().is_empty()) {
        rest.pop();
    }

    let (rule, caps) = match ctx
        .rules
        .get(RuleKind::Task)
        .and_then(|r| r.captures(d.first).map(|c| (r, c)))
    {
        Some(found) => found,
        None => match ctx
            .rules
            .get(RuleKind::List)
            .and_then(|r| r.captures(d.first).map(|c| (r, c)))
        {
            Some(found) => found,
            None => return vec![],
        },
    };
    let content = rule
        .kind
        .content_group()
        .and_then(|g| caps.get(g))
        .map_or("", |m| m.as_str());

    let mut body = content.to_string();
    for line in rest {
        body.push('\n');
        body.push_str(line);
    }
    (rule.run)(
        &RuleMatch {
            caps,
            source: &body,
            finished: true,
        },
        ctx,
    )
}

#[cfg(test)]
mod tests {
    use crate::parsing::parse;
    use crate::schema::{ElementKind, Node};
    use pretty_assertions::assert_eq;

    fn item(text: &str) -> Node {
        Node::element(
            ElementKind::ListItem,
            vec![Node::paragraph(vec![Node::text(text)])],
        )
    }

    #[test]
    fn ordered_list_keeps_start() {
        let schema = parse("3. a\n4. b").schema;
        assert_eq!(
            schema,
            vec![Node::element(
                ElementKind::List {
                    ordered: true,
                    start: Some(3)
                },
                vec![item("a"), item("b")]
            )]
        );
    }

    #[test]
    fn nested_list_lives_in_item() {
        let schema = parse("- a\n  - b\n- c").schema;
        let bullet = ElementKind::List {
            ordered: false,
            start: None,
        };
        assert_eq!(
            schema,
            vec![Node::element(
                bullet.clone(),
                vec![
                    Node::element(
                        ElementKind::ListItem,
                        vec![
                            Node::paragraph(vec![Node::text("a")]),
                            Node::element(bullet, vec![item("b")]),
                        ]
                    ),
                    item("c"),
                ]
            )]
        );
    }

    #[test]
    fn switching_marker_kind_starts_new_list() {
        let schema = parse("- a\n1. b").schema;
        assert_eq!(schema.len(), 2);
        assert_eq!(
            schema[1].kind(),
            Some(&ElementKind::List {
                ordered: true,
                start: Some(1)
            })
        );
    }

    #[test]
    fn tasks_become_task_nodes() {
        let schema = parse("- [ ] todo\n- [x] done").schema;
        let kinds: Vec<_> = schema[0].children().iter().map(|n| n.kind().cloned()).collect();
        assert_eq!(
            kinds,
            vec![
                Some(ElementKind::Task { checked: false }),
                Some(ElementKind::Task { checked: true })
            ]
        );
        assert_eq!(schema[0].children()[1].text_content(), "done");
    }

    #[test]
    fn empty_item_has_caret_position() {
        let schema = parse("- ").schema;
        assert_eq!(schema[0].children()[0], item(""));
    }
}
