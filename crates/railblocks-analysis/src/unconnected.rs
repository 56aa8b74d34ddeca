//! Unconnected-slot detection.

use railblocks_types::{Forest, NodeId};

/// Flag every node with at least one empty declared slot.
///
/// The generator degrades output for such nodes instead of failing, so this
/// flag is the only signal the program text is incomplete. Unused status is
/// deliberately ignored: a half-built orphan chain keeps its warnings while
/// it is parked off to the side.
pub fn mark_unconnected(forest: &mut Forest) {
    let flags: Vec<(NodeId, bool)> = forest
        .iter()
        .map(|(id, node)| {
            let open = node.data.slots().iter().any(|(_, _, slot)| slot.is_none());
            (id, open)
        })
        .collect();
    for (id, open) in flags {
        if let Some(node) = forest.node_mut(id) {
            node.flags.unconnected = open;
        }
    }
}
