use crate::schema::{ElementKind, Node};

/// Validates parser output invariants.
///
/// Asserts that:
/// - every element has at least one child
/// - lists only hold `list-item`/`task` nodes
/// - tables only hold rows, rows only hold cells, and every row has one cell
///   per declared column
/// - block containers never directly hold text runs
///
/// # Panics
/// Panics with a descriptive message if any invariant is violated.
pub fn check(schema: &[Node]) {
    for node in schema {
        check_node(node);
    }
}

fn check_node(node: &Node) {
    let Node::Element(el) = node else {
        return;
    };
    assert!(
        !el.children.is_empty(),
        "{} has no children",
        el.kind.type_name()
    );
    match &el.kind {
        ElementKind::List { .. } => {
            for child in &el.children {
                assert!(
                    matches!(
                        child.kind(),
                        Some(ElementKind::ListItem | ElementKind::Task { .. })
                    ),
                    "list child is {:?}",
                    child.type_name()
                );
            }
        }
        ElementKind::Table { aligns } => {
            for row in &el.children {
                assert!(
                    matches!(row.kind(), Some(ElementKind::TableRow { .. })),
                    "table child is {:?}",
                    row.type_name()
                );
                assert_eq!(
                    row.children().len(),
                    aligns.len(),
                    "row width differs from column count"
                );
                for cell in row.children() {
                    assert_eq!(cell.type_name(), Some("table-cell"));
                }
            }
        }
        ElementKind::ListItem | ElementKind::Task { .. } | ElementKind::Blockquote => {
            for child in &el.children {
                assert!(
                    !child.is_text(),
                    "{} holds a bare text run",
                    el.kind.type_name()
                );
            }
        }
        _ => {}
    }
    for child in &el.children {
        check_node(child);
    }
}
