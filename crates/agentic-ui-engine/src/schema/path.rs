use super::Node;

/// Positional identity of a node: child indices from the root forest.
pub type NodePath = Vec<usize>;

pub fn node_at<'a>(nodes: &'a [Node], path: &[usize]) -> Option<&'a Node> {
    let (first, rest) = path.split_first()?;
    let mut node = nodes.get(*first)?;
    for i in rest {
        node = node.children().get(*i)?;
    }
    Some(node)
}

pub fn node_at_mut<'a>(nodes: &'a mut [Node], path: &[usize]) -> Option<&'a mut Node> {
    let (first, rest) = path.split_first()?;
    let mut node = nodes.get_mut(*first)?;
    for i in rest {
        node = node.children_mut()?.get_mut(*i)?;
    }
    Some(node)
}

/// The sibling list holding `path`'s last index, plus that index.
pub fn siblings_mut<'a>(
    nodes: &'a mut Vec<Node>,
    path: &[usize],
) -> Option<(&'a mut Vec<Node>, usize)> {
    let (last, parent) = path.split_last()?;
    if parent.is_empty() {
        return Some((nodes, *last));
    }
    let parent = node_at_mut(nodes, parent)?;
    Some((parent.children_mut()?, *last))
}

/// Types along a path, `None` marking a text run. `None` overall if the path
/// does not resolve.
pub fn type_chain(nodes: &[Node], path: &[usize]) -> Option<Vec<Option<&'static str>>> {
    let mut chain = Vec::with_capacity(path.len());
    let mut level = nodes;
    for i in path {
        let node = level.get(*i)?;
        chain.push(node.type_name());
        level = node.children();
    }
    Some(chain)
}

/// Descends from `prefix` through first children until a text leaf.
pub fn first_leaf_path(nodes: &[Node], prefix: &[usize]) -> Option<NodePath> {
    let mut path = prefix.to_vec();
    let mut node = node_at(nodes, prefix)?;
    while let Some(first) = node.children().first() {
        path.push(0);
        node = first;
    }
    Some(path)
}
