//! Error types for the RailBlocks core.
//!
//! Three separate families: [`EditError`] for rejected edits (recoverable,
//! surfaced to the editing surface), [`StructureError`] for integrity
//! violations that should never happen at runtime (programming errors,
//! detected defensively), and [`DocumentError`] for malformed persisted
//! payloads.

use thiserror::Error;

use crate::node::{NodeId, SlotRef};

/// An edit was rejected because it would violate a forest invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The referenced node does not exist (or was deleted).
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The entry root cannot be deleted, moved, or attached to anything.
    #[error("the entry root cannot be deleted or attached")]
    EntryRootImmutable,

    /// The child already has an incoming parent or chain edge.
    #[error("node {0} is already attached elsewhere")]
    AlreadyAttached(NodeId),

    /// The parent node declares no such slot.
    #[error("node {node} has no slot {slot}")]
    NoSuchSlot { node: NodeId, slot: SlotRef },

    /// The slot already holds a child.
    #[error("slot {slot} of node {node} is already occupied")]
    SlotOccupied { node: NodeId, slot: SlotRef },

    /// The node already has a chain successor.
    #[error("node {0} already has a successor")]
    SuccessorOccupied(NodeId),

    /// A non-statement node was placed where a statement chain is expected.
    #[error("a {0} node cannot be placed in a statement position")]
    NotAStatement(&'static str),

    /// A non-value node was placed in a value slot.
    #[error("a {0} node cannot be placed in a value slot")]
    NotAValue(&'static str),

    /// A `Program`, `Loop`, or value node takes no chain successor.
    #[error("a {0} node takes no successor")]
    NoSuccessor(&'static str),

    /// Arity operations only apply to dynamic-arity node types.
    #[error("node {0} has no adjustable arity")]
    NotDynamicArity(NodeId),

    /// A node cannot be attached to itself.
    #[error("a node cannot be attached to itself")]
    SelfAttachment,
}

/// A structural integrity violation.
///
/// These are defensive-only conditions: the edit operations maintain the
/// invariants that rule them out, so hitting one means a bug in the caller
/// (or a hand-corrupted forest). They are reported, never silently looped on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    /// A statement chain loops back on itself.
    #[error("cycle detected in statement chain at {0}")]
    ChainCycle(NodeId),

    /// A node is reachable from two different parent/chain edges.
    #[error("node {0} is claimed by more than one parent edge")]
    SharedChild(NodeId),

    /// An edge points at a node that is not in the arena.
    #[error("edge from {from} references missing node {to}")]
    DanglingEdge { from: NodeId, to: NodeId },

    /// A node's parent back-reference disagrees with the incoming edge.
    #[error("parent back-reference of {0} does not match its incoming edge")]
    BrokenBackRef(NodeId),
}

/// A persisted document could not be loaded.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unknown node kind `{0}`")]
    UnknownKind(String),

    #[error("duplicate node id {0}")]
    DuplicateId(u32),

    /// The record with id 0 is missing or is not a `Program` node.
    #[error("document has no entry root (record 0 must be a Program node)")]
    MissingEntryRoot,

    #[error("record {id}: field `{field}` {reason}")]
    BadField {
        id: u32,
        field: String,
        reason: String,
    },

    #[error("record {0}: unknown slot `{1}`")]
    UnknownSlot(u32, String),

    #[error("record {from} references missing node id {to}")]
    DanglingLink { from: u32, to: u32 },

    /// Reconstructing the linkage violated a forest invariant.
    #[error("record {id}: {source}")]
    Link { id: u32, source: EditError },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
