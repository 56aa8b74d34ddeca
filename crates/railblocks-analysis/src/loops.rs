//! Loop-containment warning.
//!
//! A Loop node never returns, so RailSL text sequenced after a Parallel or
//! Conditional construct whose subtree contains one is unreachable (Parallel)
//! or conditionally unreachable (Conditional). That is easy to miss in the
//! visual editor, so the containing construct gets a warning flag.

use std::collections::HashSet;

use railblocks_types::{Forest, NodeData, NodeId};

/// Whether `id` is a Loop node or any statement reachable through its slots
/// (recursively, across chains) is one. The node's own chain successors are
/// not part of its subtree.
///
/// Bounded by a visited set so the check terminates even on a forest with
/// accidentally cyclic links.
pub fn contains_loop(forest: &Forest, id: NodeId) -> bool {
    let mut visited = HashSet::new();
    walk(forest, id, &mut visited)
}

fn walk(forest: &Forest, id: NodeId, visited: &mut HashSet<NodeId>) -> bool {
    if !visited.insert(id) {
        return false;
    }
    let Some(node) = forest.node(id) else {
        return false;
    };
    if matches!(node.data, NodeData::Loop { .. }) {
        return true;
    }
    for (_, _, head) in node.data.slots() {
        let mut current = head;
        while let Some(child) = current {
            if visited.contains(&child) {
                break;
            }
            if walk(forest, child, visited) {
                return true;
            }
            current = forest.node(child).and_then(|n| n.next);
        }
    }
    false
}

/// Set or clear the loop-containment flag on every Parallel and Conditional
/// node, reflecting current truth. Other node types never carry this flag.
pub fn mark_warnings(forest: &mut Forest) {
    let containers: Vec<NodeId> = forest
        .iter()
        .filter(|(_, node)| {
            matches!(
                node.data,
                NodeData::ParallelStatic { .. }
                    | NodeData::ParallelDynamic { .. }
                    | NodeData::ConditionalStatic { .. }
                    | NodeData::ConditionalDynamic { .. }
            )
        })
        .map(|(id, _)| id)
        .collect();
    for id in containers {
        let warned = contains_loop(forest, id);
        if let Some(node) = forest.node_mut(id) {
            node.flags.loop_inside = warned;
        }
    }
}
