//! The recompute driver.
//!
//! Every external edit triggers one synchronous [`recompute`] pass over the
//! forest, in a fixed phase order:
//!
//! 1. integrity check (defensive, fatal on violation)
//! 2. dynamic-arity reconciliation for the edited node only
//! 3. full recompile to RailSL text
//! 4. on structural edits only, unused and loop-containment analyses
//! 5. unconnected-slot analysis, unconditionally
//!
//! All phases run to completion before the next edit is accepted. The model
//! is single-writer and single-threaded; a recompute is bounded by forest
//! size and holds no resources.

use std::collections::BTreeSet;

use railblocks_analysis::{mark_unconnected, mark_unused, mark_warnings};
use railblocks_codegen::compile;
use railblocks_types::{Forest, NodeId, StructureError, WarningKind};

/// What kind of edit just happened. Field edits skip the reachability and
/// loop analyses since they cannot change structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    NodeAdded,
    NodeRemoved,
    Relinked,
    ArityChanged,
    FieldChanged,
}

impl EditKind {
    pub fn is_structural(self) -> bool {
        !matches!(self, Self::FieldChanged)
    }
}

/// One external edit, as reported by the editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditEvent {
    pub kind: EditKind,
    /// The node the edit touched, when it still exists.
    pub node: Option<NodeId>,
}

impl EditEvent {
    pub fn node_added(node: NodeId) -> Self {
        Self {
            kind: EditKind::NodeAdded,
            node: Some(node),
        }
    }

    pub fn node_removed() -> Self {
        Self {
            kind: EditKind::NodeRemoved,
            node: None,
        }
    }

    pub fn relinked(node: NodeId) -> Self {
        Self {
            kind: EditKind::Relinked,
            node: Some(node),
        }
    }

    pub fn arity_changed(node: NodeId) -> Self {
        Self {
            kind: EditKind::ArityChanged,
            node: Some(node),
        }
    }

    pub fn field_changed(node: NodeId) -> Self {
        Self {
            kind: EditKind::FieldChanged,
            node: Some(node),
        }
    }
}

/// The result of one recompute pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recompute {
    /// The full RailSL text, primary program plus commented orphan block.
    pub text: String,
    /// Every (node, kind) warning currently set, in stable order.
    pub warnings: BTreeSet<(NodeId, WarningKind)>,
}

/// Run the full per-edit pipeline.
///
/// The only error is a structural integrity violation, which means a bug in
/// the caller rather than a bad program; compilation and the analyses
/// themselves never fail.
pub fn recompute(forest: &mut Forest, event: &EditEvent) -> Result<Recompute, StructureError> {
    forest.check_integrity()?;

    if let Some(node) = event.node {
        forest.reconcile(node);
    }

    let entry = forest.entry();
    let text = compile(forest, entry);

    if event.kind.is_structural() {
        mark_unused(forest, entry);
        mark_warnings(forest);
    }
    mark_unconnected(forest);

    let warnings = forest
        .iter()
        .flat_map(|(id, node)| node.flags.kinds().map(move |kind| (id, kind)))
        .collect();

    Ok(Recompute { text, warnings })
}
