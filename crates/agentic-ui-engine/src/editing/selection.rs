use crate::schema::{Node, NodePath, first_leaf_path, node_at, type_chain};

/// A caret position: the path of a text run and a char offset into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Point {
    pub path: NodePath,
    pub offset: usize,
}

impl Point {
    pub fn new(path: NodePath, offset: usize) -> Self {
        Self { path, offset }
    }

    /// Start of the first text run at or below `prefix`.
    pub fn start_of(nodes: &[Node], prefix: &[usize]) -> Option<Self> {
        first_leaf_path(nodes, prefix).map(|path| Self { path, offset: 0 })
    }

    /// The top-level block holding this point.
    pub fn block(&self) -> Option<usize> {
        self.path.first().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// Re-resolves `sel` (valid against `old`) against `new`.
///
/// Best effort. A point whose path resolves to a text run with the same type
/// chain in both trees keeps its offset, clamped to the new text length.
/// Anything else moves to the start of the nearest surviving node: the
/// longest prefix of its path that still resolves, else the last block.
/// `None` when `new` is empty.
pub fn remap(old: &[Node], new: &[Node], sel: &Selection) -> Option<Selection> {
    Some(Selection {
        anchor: remap_point(old, new, &sel.anchor)?,
        focus: remap_point(old, new, &sel.focus)?,
    })
}

pub fn remap_point(old: &[Node], new: &[Node], point: &Point) -> Option<Point> {
    let before = type_chain(old, &point.path);
    let after = type_chain(new, &point.path);
    if before.is_some()
        && before == after
        && let Some(Node::Text(run)) = node_at(new, &point.path)
    {
        return Some(Point {
            path: point.path.clone(),
            offset: point.offset.min(run.text.chars().count()),
        });
    }

    for len in (1..=point.path.len()).rev() {
        let prefix = &point.path[..len];
        if node_at(new, prefix).is_some() {
            return Point::start_of(new, prefix);
        }
    }
    let last = new.len().checked_sub(1)?;
    Point::start_of(new, &[last])
}
