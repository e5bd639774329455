//! Prioritised diff between two node lists.
//!
//! Operations only ever remove trailing children or append new ones, so no
//! operation shifts the index of another. Sorting by priority (stable, so
//! same-priority operations keep generation order) runs removals first and
//! appends last.

use std::mem::discriminant;

use crate::schema::{ElementKind, Node, NodePath, TextRun, node_at_mut, siblings_mut};

pub mod priority {
    pub const REMOVE: u8 = 0;
    /// Also used for trailing table rows.
    pub const CELL_REMOVE: u8 = 1;
    /// Also used for appended table rows.
    pub const REPLACE: u8 = 5;
    pub const CELL_INSERT: u8 = 6;
    pub const UPDATE: u8 = 7;
    pub const TEXT: u8 = 8;
    pub const INSERT: u8 = 10;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Insert(Node),
    Remove,
    Replace(Node),
    /// New element metadata; children are diffed separately.
    SetKind(ElementKind),
    /// New marks for a text run, keeping its text.
    SetMarks(TextRun),
    Text(String),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Insert(_) => "insert",
            Action::Remove => "remove",
            Action::Replace(_) => "replace",
            Action::SetKind(_) | Action::SetMarks(_) => "update",
            Action::Text(_) => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub path: NodePath,
    pub action: Action,
    pub priority: u8,
}

impl Operation {
    fn new(path: NodePath, action: Action, priority: u8) -> Self {
        Self {
            path,
            action,
            priority,
        }
    }
}

/// Operations turning `old` into `new`, in execution order.
pub fn diff(new: &[Node], old: &[Node]) -> Vec<Operation> {
    let mut ops = Vec::new();
    diff_children(new, old, &[], &mut ops, (priority::INSERT, priority::REMOVE));
    ops.sort_by_key(|op| op.priority);
    ops
}

fn child(base: &[usize], i: usize) -> NodePath {
    let mut path = Vec::with_capacity(base.len() + 1);
    path.extend_from_slice(base);
    path.push(i);
    path
}

fn diff_children(
    new: &[Node],
    old: &[Node],
    base: &[usize],
    ops: &mut Vec<Operation>,
    (insert, remove): (u8, u8),
) {
    for (i, node) in new.iter().enumerate().skip(old.len()) {
        ops.push(Operation::new(child(base, i), Action::Insert(node.clone()), insert));
    }
    for i in (new.len()..old.len()).rev() {
        ops.push(Operation::new(child(base, i), Action::Remove, remove));
    }
    for (i, (n, o)) in new.iter().zip(old).enumerate() {
        if n != o {
            compare(n, o, &child(base, i), ops);
        }
    }
}

fn compare(new: &Node, old: &Node, path: &[usize], ops: &mut Vec<Operation>) {
    match (new, old) {
        (Node::Text(n), Node::Text(o)) => {
            if n.text != o.text {
                ops.push(Operation::new(
                    path.to_vec(),
                    Action::Text(n.text.clone()),
                    priority::TEXT,
                ));
            }
            if !n.same_marks(o) {
                ops.push(Operation::new(
                    path.to_vec(),
                    Action::SetMarks(n.clone()),
                    priority::UPDATE,
                ));
            }
        }
        (Node::Element(n), Node::Element(o)) if !needs_replace(&n.kind, &o.kind) => {
            if n.kind != o.kind {
                ops.push(Operation::new(
                    path.to_vec(),
                    Action::SetKind(n.kind.clone()),
                    priority::UPDATE,
                ));
            }
            match n.kind {
                ElementKind::Table { .. } => diff_children(
                    &n.children,
                    &o.children,
                    path,
                    ops,
                    (priority::REPLACE, priority::CELL_REMOVE),
                ),
                ElementKind::TableRow { .. } => diff_children(
                    &n.children,
                    &o.children,
                    path,
                    ops,
                    (priority::CELL_INSERT, priority::CELL_REMOVE),
                ),
                _ => diff_children(
                    &n.children,
                    &o.children,
                    path,
                    ops,
                    (priority::INSERT, priority::REMOVE),
                ),
            }
        }
        _ => ops.push(Operation::new(
            path.to_vec(),
            Action::Replace(new.clone()),
            priority::REPLACE,
        )),
    }
}

/// Different element types, or a code block whose fence state flipped.
fn needs_replace(new: &ElementKind, old: &ElementKind) -> bool {
    if discriminant(new) != discriminant(old) {
        return true;
    }
    matches!(
        (new, old),
        (ElementKind::Code { finished: a, .. }, ElementKind::Code { finished: b, .. }) if a != b
    )
}

/// Applies one operation. `false` (logged) when the path no longer fits.
pub(crate) fn execute(op: &Operation, nodes: &mut Vec<Node>) -> bool {
    let applied = match &op.action {
        Action::Insert(node) => match siblings_mut(nodes, &op.path) {
            Some((list, idx)) if idx <= list.len() => {
                list.insert(idx, node.clone());
                true
            }
            _ => false,
        },
        Action::Remove => match siblings_mut(nodes, &op.path) {
            Some((list, idx)) if idx < list.len() => {
                list.remove(idx);
                true
            }
            _ => false,
        },
        Action::Replace(node) => match node_at_mut(nodes, &op.path) {
            Some(slot) => {
                *slot = node.clone();
                true
            }
            None => false,
        },
        Action::SetKind(kind) => match node_at_mut(nodes, &op.path) {
            Some(Node::Element(el)) => {
                el.kind = kind.clone();
                true
            }
            _ => false,
        },
        Action::SetMarks(marks) => match node_at_mut(nodes, &op.path) {
            Some(Node::Text(run)) => {
                run.bold = marks.bold;
                run.italic = marks.italic;
                run.strikethrough = marks.strikethrough;
                run.code = marks.code;
                true
            }
            _ => false,
        },
        Action::Text(text) => match node_at_mut(nodes, &op.path) {
            Some(Node::Text(run)) => {
                run.text.clone_from(text);
                true
            }
            _ => false,
        },
    };
    if !applied {
        log::warn!("skipping {} at {:?}: path does not fit", op.action.name(), op.path);
    }
    applied
}
