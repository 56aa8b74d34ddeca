//! The forest arena: owned node storage with opaque-handle edges.
//!
//! All structural edits go through [`Forest`] operations, which maintain the
//! invariants the rest of the core relies on: statement slots hold heads of
//! acyclic chains, every node has at most one incoming edge, and exactly one
//! entry root exists. Edges are arena lookups, so cycles cannot arise from
//! ownership and are cheaply checkable when they do arise from a bug.

use std::collections::HashSet;

use crate::error::{EditError, StructureError};
use crate::node::{Node, NodeData, NodeId, SlotKind, SlotRef};

/// The node forest. Ids are never reused; deletion leaves a tombstone, and
/// iteration order is creation order.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    nodes: Vec<Option<Node>>,
}

impl Forest {
    /// The fixed identity of the entry root.
    pub const ENTRY: NodeId = NodeId(0);

    /// A fresh forest holding only the entry root (a `Program` node).
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new(NodeData::program()))],
        }
    }

    pub fn entry(&self) -> NodeId {
        Self::ENTRY
    }

    // ── Access ───────────────────────────────────────────────────────────

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node(id).map(|n| &n.data)
    }

    /// Mutable access for field edits. Structural edges must be changed
    /// through the edit operations instead.
    pub fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.node_mut(id).map(|n| &mut n.data)
    }

    /// Live nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|n| (NodeId(i as u32), n)))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Roots (nodes with no incoming edge) in creation order. The entry root
    /// comes first; every other entry is an orphan root.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| id)
    }

    /// Walk parent back-references up to the root of the tree containing
    /// `id`. Bounded by a visited set so a corrupted forest cannot hang the
    /// walk; on a cycle the last node seen is returned.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut seen = HashSet::new();
        let mut current = id;
        while seen.insert(current) {
            match self.node(current).and_then(|n| n.parent) {
                Some(parent) if self.contains(parent) => current = parent,
                _ => break,
            }
        }
        current
    }

    // ── Creation ─────────────────────────────────────────────────────────

    /// Add a node with the given payload as a new orphan root. Dynamic-arity
    /// payloads are reconciled immediately so the node is born settled.
    pub fn add_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node::new(data)));
        self.reconcile(id);
        id
    }

    // ── Linking ──────────────────────────────────────────────────────────

    /// Attach `child` (a chain head or value node) into a slot of `parent`.
    pub fn connect_slot(
        &mut self,
        parent: NodeId,
        slot: SlotRef,
        child: NodeId,
    ) -> Result<(), EditError> {
        if parent == child {
            return Err(EditError::SelfAttachment);
        }
        if child == Self::ENTRY {
            return Err(EditError::EntryRootImmutable);
        }
        let child_node = self.node(child).ok_or(EditError::UnknownNode(child))?;
        if child_node.parent.is_some() {
            return Err(EditError::AlreadyAttached(child));
        }
        let child_kind = child_node.data.kind_name();
        let child_is_value = child_node.data.is_value();
        let child_is_statement = child_node.data.is_statement();

        let parent_node = self.node(parent).ok_or(EditError::UnknownNode(parent))?;
        let (kind, current) = parent_node
            .data
            .slot(slot)
            .ok_or(EditError::NoSuchSlot { node: parent, slot })?;
        if current.is_some() {
            return Err(EditError::SlotOccupied { node: parent, slot });
        }
        match kind {
            SlotKind::Statement if !child_is_statement => {
                return Err(EditError::NotAStatement(child_kind));
            }
            SlotKind::Value if !child_is_value => {
                return Err(EditError::NotAValue(child_kind));
            }
            _ => {}
        }

        if let Some(p) = self.node_mut(parent) {
            p.data.set_slot(slot, Some(child));
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    /// Empty a slot of `parent`; the former child (if any) becomes an orphan
    /// root and is returned.
    pub fn disconnect_slot(
        &mut self,
        parent: NodeId,
        slot: SlotRef,
    ) -> Result<Option<NodeId>, EditError> {
        let parent_node = self.node(parent).ok_or(EditError::UnknownNode(parent))?;
        let (_, current) = parent_node
            .data
            .slot(slot)
            .ok_or(EditError::NoSuchSlot { node: parent, slot })?;
        if let Some(p) = self.node_mut(parent) {
            p.data.set_slot(slot, None);
        }
        if let Some(child) = current {
            if let Some(c) = self.node_mut(child) {
                c.parent = None;
            }
        }
        Ok(current)
    }

    /// Chain `node` after `prev`.
    pub fn connect_next(&mut self, prev: NodeId, node: NodeId) -> Result<(), EditError> {
        if prev == node {
            return Err(EditError::SelfAttachment);
        }
        if node == Self::ENTRY {
            return Err(EditError::EntryRootImmutable);
        }
        let node_ref = self.node(node).ok_or(EditError::UnknownNode(node))?;
        if node_ref.parent.is_some() {
            return Err(EditError::AlreadyAttached(node));
        }
        if !node_ref.data.is_statement() {
            return Err(EditError::NotAStatement(node_ref.data.kind_name()));
        }

        let prev_node = self.node(prev).ok_or(EditError::UnknownNode(prev))?;
        if !prev_node.data.takes_successor() {
            return Err(EditError::NoSuccessor(prev_node.data.kind_name()));
        }
        if prev_node.next.is_some() {
            return Err(EditError::SuccessorOccupied(prev));
        }

        if let Some(p) = self.node_mut(prev) {
            p.next = Some(node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = Some(prev);
        }
        Ok(())
    }

    /// Break the chain after `prev`; the detached successor (if any) becomes
    /// an orphan root and is returned.
    pub fn disconnect_next(&mut self, prev: NodeId) -> Result<Option<NodeId>, EditError> {
        let prev_node = self.node(prev).ok_or(EditError::UnknownNode(prev))?;
        let detached = prev_node.next;
        if let Some(p) = self.node_mut(prev) {
            p.next = None;
        }
        if let Some(child) = detached {
            if let Some(c) = self.node_mut(child) {
                c.parent = None;
            }
        }
        Ok(detached)
    }

    // ── Arity ────────────────────────────────────────────────────────────

    /// Set the desired arity of a dynamic-arity node (clamped to ≥ 1). The
    /// shape is rebuilt by the next [`reconcile`](Self::reconcile).
    pub fn set_desired_arity(&mut self, id: NodeId, n: usize) -> Result<(), EditError> {
        let node = self.node_mut(id).ok_or(EditError::UnknownNode(id))?;
        match &mut node.data {
            NodeData::TrackSet { segments, .. } => segments.set_desired(n),
            NodeData::TrackSetAlt { segments, .. } => segments.set_desired(n),
            NodeData::PointSet { points, .. } => points.set_desired(n),
            NodeData::LightSet { lights, .. } => lights.set_desired(n),
            NodeData::ConditionalDynamic { branches } => branches.set_desired(n),
            NodeData::ParallelDynamic { branches } => branches.set_desired(n),
            _ => return Err(EditError::NotDynamicArity(id)),
        }
        Ok(())
    }

    /// Request one more repetition (the + button).
    pub fn increment_arity(&mut self, id: NodeId) -> Result<(), EditError> {
        let current = self
            .data(id)
            .and_then(NodeData::desired_arity)
            .ok_or(EditError::NotDynamicArity(id))?;
        self.set_desired_arity(id, current + 1)
    }

    /// Request one fewer repetition (the − button). A no-op at the minimum
    /// of 1.
    pub fn decrement_arity(&mut self, id: NodeId) -> Result<(), EditError> {
        let current = self
            .data(id)
            .and_then(NodeData::desired_arity)
            .ok_or(EditError::NotDynamicArity(id))?;
        self.set_desired_arity(id, current.saturating_sub(1).max(1))
    }

    /// Bring the node's repetition slots in line with its desired arity.
    /// Chains attached to removed branch slots are re-rooted as orphans.
    /// A no-op for non-dynamic-arity nodes and for settled groups.
    pub fn reconcile(&mut self, id: NodeId) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        let detached = match &mut node.data {
            NodeData::TrackSet { segments, .. } => segments.reconcile(),
            NodeData::TrackSetAlt { segments, .. } => segments.reconcile(),
            NodeData::PointSet { points, .. } => points.reconcile(),
            NodeData::LightSet { lights, .. } => lights.reconcile(),
            NodeData::ConditionalDynamic { branches } => branches.reconcile(),
            NodeData::ParallelDynamic { branches } => branches.reconcile(),
            _ => return,
        };
        for head in detached {
            if let Some(n) = self.node_mut(head) {
                n.parent = None;
            }
        }
    }

    // ── Deletion ─────────────────────────────────────────────────────────

    /// Delete `id`, its chained successors and all slot children,
    /// transitively — a chain is deleted as a unit. The entry root is
    /// immune.
    pub fn delete_chain(&mut self, id: NodeId) -> Result<(), EditError> {
        if id == Self::ENTRY {
            return Err(EditError::EntryRootImmutable);
        }
        if !self.contains(id) {
            return Err(EditError::UnknownNode(id));
        }
        self.detach(id);

        let mut doomed = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if current == Self::ENTRY || !doomed.insert(current) {
                continue;
            }
            if let Some(node) = self.node(current) {
                if let Some(next) = node.next {
                    stack.push(next);
                }
                for (_, _, slot) in node.data.slots() {
                    if let Some(child) = slot {
                        stack.push(child);
                    }
                }
            }
        }
        for victim in doomed {
            if let Some(slot) = self.nodes.get_mut(victim.0 as usize) {
                *slot = None;
            }
        }
        Ok(())
    }

    /// Clear the incoming edge of `id`, wherever it comes from.
    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            if p.next == Some(id) {
                p.next = None;
            } else {
                let slots = p.data.slots();
                for (slot_ref, _, value) in slots {
                    if value == Some(id) {
                        p.data.set_slot(slot_ref, None);
                    }
                }
            }
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = None;
        }
    }

    // ── Integrity ────────────────────────────────────────────────────────

    /// Defensive structural check: every edge targets a live node whose
    /// back-reference agrees, no node has two incoming edges, and no chain
    /// cycles. Violations are programming errors, not expected runtime
    /// states.
    pub fn check_integrity(&self) -> Result<(), StructureError> {
        let mut claimed = HashSet::new();
        for (id, node) in self.iter() {
            let mut edges: Vec<NodeId> = Vec::new();
            if let Some(next) = node.next {
                edges.push(next);
            }
            for (_, _, slot) in node.data.slots() {
                if let Some(child) = slot {
                    edges.push(child);
                }
            }
            for target in edges {
                let Some(target_node) = self.node(target) else {
                    return Err(StructureError::DanglingEdge { from: id, to: target });
                };
                if !claimed.insert(target) {
                    return Err(StructureError::SharedChild(target));
                }
                if target_node.parent != Some(id) {
                    return Err(StructureError::BrokenBackRef(target));
                }
            }
        }

        for (id, _) in self.iter() {
            let mut path = HashSet::new();
            let mut current = Some(id);
            while let Some(c) = current {
                if !path.insert(c) {
                    return Err(StructureError::ChainCycle(c));
                }
                current = self.node(c).and_then(|n| n.next);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{CrossingAction, SlotRef};

    fn crossing() -> NodeData {
        NodeData::Crossing {
            action: CrossingAction::Open,
        }
    }

    #[test]
    fn test_new_forest_has_entry_program() {
        let forest = Forest::new();
        assert_eq!(forest.len(), 1);
        assert!(matches!(
            forest.data(Forest::ENTRY),
            Some(NodeData::Program { body: None })
        ));
        assert_eq!(forest.roots().collect::<Vec<_>>(), vec![Forest::ENTRY]);
    }

    #[test]
    fn test_add_node_is_orphan_root_and_settled() {
        let mut forest = Forest::new();
        let id = forest.add_node(NodeData::parallel_dynamic());
        assert!(forest.node(id).unwrap().parent.is_none());
        assert_eq!(forest.data(id).unwrap().actual_arity(), Some(1));
    }

    #[test]
    fn test_connect_slot_sets_backref() {
        let mut forest = Forest::new();
        let stmt = forest.add_node(crossing());
        forest
            .connect_slot(Forest::ENTRY, SlotRef::Body, stmt)
            .unwrap();
        assert_eq!(forest.node(stmt).unwrap().parent, Some(Forest::ENTRY));
        assert_eq!(
            forest.data(Forest::ENTRY).unwrap().slot(SlotRef::Body),
            Some((crate::node::SlotKind::Statement, Some(stmt)))
        );
    }

    #[test]
    fn test_single_incoming_edge_enforced() {
        let mut forest = Forest::new();
        let stmt = forest.add_node(crossing());
        let parallel = forest.add_node(NodeData::parallel_static());
        forest
            .connect_slot(parallel, SlotRef::Branch(0), stmt)
            .unwrap();
        assert_eq!(
            forest.connect_slot(parallel, SlotRef::Branch(1), stmt),
            Err(EditError::AlreadyAttached(stmt))
        );
        assert_eq!(
            forest.connect_slot(Forest::ENTRY, SlotRef::Body, stmt),
            Err(EditError::AlreadyAttached(stmt))
        );
    }

    #[test]
    fn test_entry_root_immutable() {
        let mut forest = Forest::new();
        let parallel = forest.add_node(NodeData::parallel_static());
        assert_eq!(
            forest.delete_chain(Forest::ENTRY),
            Err(EditError::EntryRootImmutable)
        );
        assert_eq!(
            forest.connect_slot(parallel, SlotRef::Branch(0), Forest::ENTRY),
            Err(EditError::EntryRootImmutable)
        );
    }

    #[test]
    fn test_slot_kind_checked() {
        let mut forest = Forest::new();
        let track = forest.add_node(NodeData::track_set());
        let stmt = forest.add_node(crossing());
        let stop = forest.add_node(NodeData::TrackVectorStop);
        assert_eq!(
            forest.connect_slot(track, SlotRef::Vector, stmt),
            Err(EditError::NotAValue("Crossing"))
        );
        assert_eq!(
            forest.connect_slot(Forest::ENTRY, SlotRef::Body, stop),
            Err(EditError::NotAStatement("TrackVectorStop"))
        );
        forest.connect_slot(track, SlotRef::Vector, stop).unwrap();
    }

    #[test]
    fn test_loop_takes_no_successor() {
        let mut forest = Forest::new();
        let lp = forest.add_node(NodeData::loop_statement());
        let stmt = forest.add_node(crossing());
        assert_eq!(
            forest.connect_next(lp, stmt),
            Err(EditError::NoSuccessor("Loop"))
        );
    }

    #[test]
    fn test_delete_chain_transitive() {
        let mut forest = Forest::new();
        let a = forest.add_node(crossing());
        let b = forest.add_node(crossing());
        let track = forest.add_node(NodeData::track_set());
        let stop = forest.add_node(NodeData::TrackVectorStop);
        forest.connect_next(a, b).unwrap();
        forest.connect_next(b, track).unwrap();
        forest.connect_slot(track, SlotRef::Vector, stop).unwrap();
        forest.connect_slot(Forest::ENTRY, SlotRef::Body, a).unwrap();

        forest.delete_chain(b).unwrap();
        assert!(forest.contains(a));
        assert!(!forest.contains(b));
        assert!(!forest.contains(track));
        assert!(!forest.contains(stop));
        // The predecessor's next edge was cleared.
        assert_eq!(forest.node(a).unwrap().next, None);
        forest.check_integrity().unwrap();
    }

    #[test]
    fn test_shrink_detaches_branch_chain_as_orphan() {
        let mut forest = Forest::new();
        let parallel = forest.add_node(NodeData::parallel_dynamic());
        forest.set_desired_arity(parallel, 2).unwrap();
        forest.reconcile(parallel);
        let stmt = forest.add_node(crossing());
        forest
            .connect_slot(parallel, SlotRef::Branch(1), stmt)
            .unwrap();

        forest.decrement_arity(parallel).unwrap();
        forest.reconcile(parallel);
        assert_eq!(forest.data(parallel).unwrap().actual_arity(), Some(1));
        assert!(forest.contains(stmt));
        assert!(forest.node(stmt).unwrap().parent.is_none());
        forest.check_integrity().unwrap();
    }

    #[test]
    fn test_integrity_detects_forced_cycle() {
        let mut forest = Forest::new();
        let a = forest.add_node(crossing());
        let b = forest.add_node(crossing());
        forest.connect_next(a, b).unwrap();
        // Corrupt the forest directly, bypassing the edit operations.
        forest.node_mut(b).unwrap().next = Some(a);
        forest.node_mut(a).unwrap().parent = Some(b);
        assert!(matches!(
            forest.check_integrity(),
            Err(StructureError::ChainCycle(_))
        ));
    }

    #[test]
    fn test_root_of_walks_to_top() {
        let mut forest = Forest::new();
        let a = forest.add_node(crossing());
        let b = forest.add_node(crossing());
        forest.connect_slot(Forest::ENTRY, SlotRef::Body, a).unwrap();
        forest.connect_next(a, b).unwrap();
        assert_eq!(forest.root_of(b), Forest::ENTRY);

        let orphan = forest.add_node(crossing());
        assert_eq!(forest.root_of(orphan), orphan);
    }
}
