//! Unused-subtree detection.

use railblocks_types::{Forest, NodeId};

/// Flag every node whose tree root is not the entry root.
///
/// Purely state-based: a previously unused node that became reachable is
/// cleared, a previously clear node that became unreachable is flagged.
/// Unused nodes only appear in the commented-out orphan block of the
/// generated text.
pub fn mark_unused(forest: &mut Forest, entry: NodeId) {
    let ids: Vec<NodeId> = forest.iter().map(|(id, _)| id).collect();
    for id in ids {
        let unused = forest.root_of(id) != entry;
        if let Some(node) = forest.node_mut(id) {
            node.flags.unused = unused;
        }
    }
}
