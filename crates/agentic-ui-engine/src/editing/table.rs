//! Row and column operations on `table` nodes.
//!
//! Column operations act on every row at once, so the table stays
//! rectangular. All functions expect a `table` element and leave anything
//! else untouched (returning `false` or `None`).

use crate::schema::{Align, ElementKind, Node, NodePath, node_at};

/// Where a caret inside a table cell sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellPosition {
    pub table: NodePath,
    pub row: usize,
    pub column: usize,
}

/// Finds the innermost table cell enclosing `path`.
pub fn locate(nodes: &[Node], path: &[usize]) -> Option<CellPosition> {
    (2..=path.len()).rev().find_map(|len| {
        let cell = &path[..len];
        let is_cell = matches!(node_at(nodes, cell)?.kind(), Some(ElementKind::TableCell));
        let table = &cell[..len - 2];
        let is_table = matches!(node_at(nodes, table)?.kind(), Some(ElementKind::Table { .. }));
        (is_cell && is_table).then(|| CellPosition {
            table: table.to_vec(),
            row: cell[len - 2],
            column: cell[len - 1],
        })
    })
}

pub fn empty_cell() -> Node {
    Node::element(ElementKind::TableCell, vec![Node::text("")])
}

pub fn empty_row(width: usize, header: bool) -> Node {
    Node::element(
        ElementKind::TableRow { header },
        (0..width).map(|_| empty_cell()).collect(),
    )
}

/// A `rows` × `cols` table of empty cells whose first row is the header.
pub fn new_table(rows: usize, cols: usize) -> Node {
    let (rows, cols) = (rows.max(1), cols.max(1));
    Node::element(
        ElementKind::Table {
            aligns: vec![None; cols],
        },
        (0..rows).map(|r| empty_row(cols, r == 0)).collect(),
    )
}

fn parts(table: &mut Node) -> Option<(&mut Vec<Option<Align>>, &mut Vec<Node>)> {
    match table {
        Node::Element(el) => match &mut el.kind {
            ElementKind::Table { aligns } => Some((aligns, &mut el.children)),
            _ => None,
        },
        Node::Text(_) => None,
    }
}

pub fn width(table: &Node) -> usize {
    match table.kind() {
        Some(ElementKind::Table { aligns }) => aligns.len(),
        _ => 0,
    }
}

/// Inserts an empty column at `at` (clamped to the width) in every row.
pub fn insert_column(table: &mut Node, at: usize) -> bool {
    let Some((aligns, rows)) = parts(table) else {
        return false;
    };
    let at = at.min(aligns.len());
    aligns.insert(at, None);
    for row in rows.iter_mut() {
        if let Some(cells) = row.children_mut() {
            let at = at.min(cells.len());
            cells.insert(at, empty_cell());
        }
    }
    true
}

/// Removes column `at` from every row. `Some(true)` when that was the last
/// column, in which case the caller removes the table.
pub fn delete_column(table: &mut Node, at: usize) -> Option<bool> {
    let (aligns, rows) = parts(table)?;
    if at >= aligns.len() {
        return None;
    }
    if aligns.len() == 1 {
        return Some(true);
    }
    aligns.remove(at);
    for row in rows.iter_mut() {
        if let Some(cells) = row.children_mut()
            && at < cells.len()
        {
            cells.remove(at);
        }
    }
    Some(false)
}

/// Inserts an empty body row at `at` (clamped, never above the header).
pub fn insert_row(table: &mut Node, at: usize) -> bool {
    let Some((aligns, rows)) = parts(table) else {
        return false;
    };
    let at = at.clamp(1, rows.len().max(1));
    rows.insert(at, empty_row(aligns.len(), false));
    true
}

/// Removes row `at`. A removed header hands its role to the next row.
/// `Some(true)` when it was the only row.
pub fn delete_row(table: &mut Node, at: usize) -> Option<bool> {
    let (_, rows) = parts(table)?;
    if at >= rows.len() {
        return None;
    }
    if rows.len() == 1 {
        return Some(true);
    }
    let removed = rows.remove(at);
    if matches!(removed.kind(), Some(ElementKind::TableRow { header: true }))
        && let Some(Node::Element(next)) = rows.get_mut(at)
    {
        next.kind = ElementKind::TableRow { header: true };
    }
    Some(false)
}
