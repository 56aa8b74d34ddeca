//! Shared types for the RailBlocks core.
//!
//! This crate holds everything the code generator, the analyses and the
//! recompute driver agree on: the node model, the forest arena with its edit
//! operations, dynamic-arity repetition groups, the segment name table,
//! warning annotations and the persisted document format.

mod arity;
mod error;
mod forest;
mod node;
mod segment;
mod warning;

pub mod document;

pub use arity::{arity_step, ArityStep, RepGroup, Repetition};
pub use error::{DocumentError, EditError, StructureError};
pub use forest::Forest;
pub use node::{
    BranchGuard, CondBranch, ContactEvent, ContactIndex, CrossingAction, LightState, Node,
    NodeData, NodeId, ParBranch, PointPosition, Slot, SlotKind, SlotRef, Speed,
};
pub use segment::{Segment, SEGMENT_NAMES};
pub use warning::{WarningFlags, WarningKind};
