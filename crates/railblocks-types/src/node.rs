//! Node model for the RailBlocks program tree.
//!
//! Every node is one statement or value producer of the visual program. The
//! node type set is closed, so [`NodeData`] is a tagged union with typed
//! payloads and the code generator dispatches with an exhaustive match.
//! Structural edges (`next`, slots) are arena handles, never owned links.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arity::{RepGroup, Repetition};
use crate::segment::Segment;
use crate::warning::WarningFlags;

// ══════════════════════════════════════════════════════════════════════════════
// Identity & slots
// ══════════════════════════════════════════════════════════════════════════════

/// Opaque handle to a node in a [`Forest`](crate::Forest) arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The raw arena index, as used in serialized documents.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A slot holds the head of a statement chain, a single value node, or
/// nothing.
pub type Slot = Option<NodeId>;

/// Whether a slot takes a statement chain or a single value node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Statement,
    Value,
}

/// Addresses one declared slot on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRef {
    /// The single statement slot of `Program` / `Loop`.
    Body,
    /// The value slot of `TrackSet` / `TrackSetAlt`.
    Vector,
    /// The i-th branch slot of a conditional or parallel node.
    Branch(usize),
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body => write!(f, "body"),
            Self::Vector => write!(f, "vector"),
            Self::Branch(i) => write!(f, "branch {i}"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Scalar field enums
// ══════════════════════════════════════════════════════════════════════════════

macro_rules! two_way {
    ($(#[$doc:meta])* $name:ident { $a:ident = $astr:literal, $b:ident = $bstr:literal }) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub enum $name {
            #[default]
            $a,
            $b,
        }

        impl $name {
            /// The keyword emitted in RailSL text.
            pub fn as_str(self) -> &'static str {
                match self {
                    Self::$a => $astr,
                    Self::$b => $bstr,
                }
            }

            /// Inverse of [`as_str`](Self::as_str), for document loading.
            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $astr => Some(Self::$a),
                    $bstr => Some(Self::$b),
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

two_way! {
    /// Track velocity setting.
    Speed { Full = "full", Slow = "slow" }
}
two_way! {
    /// Which of a segment's two contacts is meant.
    ContactIndex { First = "first", Second = "second" }
}
two_way! {
    /// Whether a contact must be reached or passed.
    ContactEvent { Reach = "Reach", Pass = "Pass" }
}
two_way! {
    /// Point (switch) position.
    PointPosition { Straight = "straight", Branch = "branch" }
}
two_way! {
    /// Light on/off state.
    LightState { On = "on", Off = "off" }
}
two_way! {
    /// Crossing barrier action.
    CrossingAction { Open = "Open", Close = "Close" }
}

/// The race-condition guard of one conditional branch: which contact of
/// which segment has to be reached first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BranchGuard {
    pub contact: ContactIndex,
    pub segment: Segment,
}

// ══════════════════════════════════════════════════════════════════════════════
// Repetition payloads
// ══════════════════════════════════════════════════════════════════════════════

/// One repetition of a `ConditionalDynamic` node: a guard plus a branch slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CondBranch {
    pub guard: BranchGuard,
    pub body: Slot,
}

impl Repetition for CondBranch {
    fn default_rep() -> Self {
        Self::default()
    }

    fn on_remove(&mut self) -> Option<NodeId> {
        self.body.take()
    }
}

/// One repetition of a `ParallelDynamic` node: a branch slot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParBranch {
    pub body: Slot,
}

impl Repetition for ParBranch {
    fn default_rep() -> Self {
        Self::default()
    }

    fn on_remove(&mut self) -> Option<NodeId> {
        self.body.take()
    }
}

// Free-text segment names used by TrackSetAlt. New repetitions default to
// the first station segment, matching the dropdown variant.
impl Repetition for String {
    fn default_rep() -> Self {
        "KH_ST_0".to_string()
    }

    fn on_remove(&mut self) -> Option<NodeId> {
        None
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// NodeData
// ══════════════════════════════════════════════════════════════════════════════

/// The typed payload of a node — one variant per type tag in the closed set.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// The program container; its subtree is the primary compiled output.
    Program { body: Slot },
    /// Repeats its body forever. Takes no successor.
    Loop { body: Slot },
    /// `Set track <segments> to <vector>.` — segments from the closed table.
    TrackSet {
        segments: RepGroup<Segment>,
        vector: Slot,
    },
    /// `Set track` with free-text segment names.
    TrackSetAlt {
        segments: RepGroup<String>,
        vector: Slot,
    },
    /// `Set point <indices> to <straight|branch>.`
    PointSet {
        points: RepGroup<u32>,
        position: PointPosition,
    },
    /// `Turn light <indices> <on|off>.`
    LightSet {
        lights: RepGroup<u32>,
        state: LightState,
    },
    /// Value node: the null velocity vector, `stop.`
    TrackVectorStop,
    /// Value node: speed with optional reverse direction.
    TrackVectorDir { speed: Speed, reverse: bool },
    /// Wait until a train reaches/passes a segment contact.
    ContactWait {
        event: ContactEvent,
        contact: ContactIndex,
        segment: Segment,
    },
    /// Wait for a fixed number of seconds.
    TimeWait { duration_secs: u32 },
    /// Open or close the crossing.
    Crossing { action: CrossingAction },
    /// Two-way branch on which contact is reached first.
    ConditionalStatic {
        guards: [BranchGuard; 2],
        branches: [Slot; 2],
    },
    /// N-way branch with user-adjustable arity.
    ConditionalDynamic { branches: RepGroup<CondBranch> },
    /// Two fixed parallel branches.
    ParallelStatic { branches: [Slot; 2] },
    /// N parallel branches with user-adjustable arity.
    ParallelDynamic { branches: RepGroup<ParBranch> },
}

impl NodeData {
    // ── Constructors with type defaults ──────────────────────────────────

    pub fn program() -> Self {
        Self::Program { body: None }
    }

    pub fn loop_statement() -> Self {
        Self::Loop { body: None }
    }

    pub fn track_set() -> Self {
        Self::TrackSet {
            segments: RepGroup::new(),
            vector: None,
        }
    }

    pub fn track_set_alt() -> Self {
        Self::TrackSetAlt {
            segments: RepGroup::new(),
            vector: None,
        }
    }

    pub fn point_set() -> Self {
        Self::PointSet {
            points: RepGroup::new(),
            position: PointPosition::Straight,
        }
    }

    pub fn light_set() -> Self {
        Self::LightSet {
            lights: RepGroup::new(),
            state: LightState::On,
        }
    }

    pub fn conditional_static() -> Self {
        Self::ConditionalStatic {
            guards: [BranchGuard::default(); 2],
            branches: [None; 2],
        }
    }

    pub fn conditional_dynamic() -> Self {
        Self::ConditionalDynamic {
            branches: RepGroup::new(),
        }
    }

    pub fn parallel_static() -> Self {
        Self::ParallelStatic { branches: [None; 2] }
    }

    pub fn parallel_dynamic() -> Self {
        Self::ParallelDynamic {
            branches: RepGroup::new(),
        }
    }

    // ── Classification ───────────────────────────────────────────────────

    /// The type tag as spelled in serialized documents.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Program { .. } => "Program",
            Self::Loop { .. } => "Loop",
            Self::TrackSet { .. } => "TrackSet",
            Self::TrackSetAlt { .. } => "TrackSetAlt",
            Self::PointSet { .. } => "PointSet",
            Self::LightSet { .. } => "LightSet",
            Self::TrackVectorStop => "TrackVectorStop",
            Self::TrackVectorDir { .. } => "TrackVectorDir",
            Self::ContactWait { .. } => "ContactWait",
            Self::TimeWait { .. } => "TimeWait",
            Self::Crossing { .. } => "Crossing",
            Self::ConditionalStatic { .. } => "ConditionalStatic",
            Self::ConditionalDynamic { .. } => "ConditionalDynamic",
            Self::ParallelStatic { .. } => "ParallelStatic",
            Self::ParallelDynamic { .. } => "ParallelDynamic",
        }
    }

    /// Value-producing nodes live in value slots only.
    pub fn is_value(&self) -> bool {
        matches!(self, Self::TrackVectorStop | Self::TrackVectorDir { .. })
    }

    /// Statement nodes can head or extend a chain.
    pub fn is_statement(&self) -> bool {
        !self.is_value() && !matches!(self, Self::Program { .. })
    }

    /// Whether a chain may continue after this node. `Program` is a root
    /// container, `Loop` never returns, and value nodes are not statements.
    pub fn takes_successor(&self) -> bool {
        !matches!(self, Self::Program { .. } | Self::Loop { .. }) && !self.is_value()
    }

    pub fn has_dynamic_arity(&self) -> bool {
        matches!(
            self,
            Self::TrackSet { .. }
                | Self::TrackSetAlt { .. }
                | Self::PointSet { .. }
                | Self::LightSet { .. }
                | Self::ConditionalDynamic { .. }
                | Self::ParallelDynamic { .. }
        )
    }

    /// The desired arity of a dynamic-arity node, `None` otherwise.
    pub fn desired_arity(&self) -> Option<usize> {
        match self {
            Self::TrackSet { segments, .. } => Some(segments.desired()),
            Self::TrackSetAlt { segments, .. } => Some(segments.desired()),
            Self::PointSet { points, .. } => Some(points.desired()),
            Self::LightSet { lights, .. } => Some(lights.desired()),
            Self::ConditionalDynamic { branches } => Some(branches.desired()),
            Self::ParallelDynamic { branches } => Some(branches.desired()),
            _ => None,
        }
    }

    /// The materialized arity of a dynamic-arity node, `None` otherwise.
    pub fn actual_arity(&self) -> Option<usize> {
        match self {
            Self::TrackSet { segments, .. } => Some(segments.actual()),
            Self::TrackSetAlt { segments, .. } => Some(segments.actual()),
            Self::PointSet { points, .. } => Some(points.actual()),
            Self::LightSet { lights, .. } => Some(lights.actual()),
            Self::ConditionalDynamic { branches } => Some(branches.actual()),
            Self::ParallelDynamic { branches } => Some(branches.actual()),
            _ => None,
        }
    }

    // ── Declared slots ───────────────────────────────────────────────────

    /// Every declared slot in declared order.
    pub fn slots(&self) -> Vec<(SlotRef, SlotKind, Slot)> {
        match self {
            Self::Program { body } | Self::Loop { body } => {
                vec![(SlotRef::Body, SlotKind::Statement, *body)]
            }
            Self::TrackSet { vector, .. } | Self::TrackSetAlt { vector, .. } => {
                vec![(SlotRef::Vector, SlotKind::Value, *vector)]
            }
            Self::ConditionalStatic { branches, .. } | Self::ParallelStatic { branches } => {
                branches
                    .iter()
                    .enumerate()
                    .map(|(i, slot)| (SlotRef::Branch(i), SlotKind::Statement, *slot))
                    .collect()
            }
            Self::ConditionalDynamic { branches } => branches
                .reps()
                .iter()
                .enumerate()
                .map(|(i, b)| (SlotRef::Branch(i), SlotKind::Statement, b.body))
                .collect(),
            Self::ParallelDynamic { branches } => branches
                .reps()
                .iter()
                .enumerate()
                .map(|(i, b)| (SlotRef::Branch(i), SlotKind::Statement, b.body))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Look up one declared slot. `None` means the node has no such slot.
    pub fn slot(&self, slot: SlotRef) -> Option<(SlotKind, Slot)> {
        self.slots()
            .into_iter()
            .find(|(r, _, _)| *r == slot)
            .map(|(_, kind, value)| (kind, value))
    }

    /// Write one declared slot. Returns `false` if the node has no such slot.
    pub fn set_slot(&mut self, slot: SlotRef, value: Slot) -> bool {
        match (self, slot) {
            (Self::Program { body } | Self::Loop { body }, SlotRef::Body) => {
                *body = value;
                true
            }
            (
                Self::TrackSet { vector, .. } | Self::TrackSetAlt { vector, .. },
                SlotRef::Vector,
            ) => {
                *vector = value;
                true
            }
            (
                Self::ConditionalStatic { branches, .. } | Self::ParallelStatic { branches },
                SlotRef::Branch(i),
            ) => match branches.get_mut(i) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            (Self::ConditionalDynamic { branches }, SlotRef::Branch(i)) => {
                match branches.get_mut(i) {
                    Some(branch) => {
                        branch.body = value;
                        true
                    }
                    None => false,
                }
            }
            (Self::ParallelDynamic { branches }, SlotRef::Branch(i)) => {
                match branches.get_mut(i) {
                    Some(branch) => {
                        branch.body = value;
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Node
// ══════════════════════════════════════════════════════════════════════════════

/// A node in the forest: typed payload, chain successor, incoming-edge
/// back-reference and warning state.
///
/// `parent` is the source of the node's single incoming edge — either the
/// node owning the slot this node sits in, or the chain predecessor. It is a
/// lookup aid, never an ownership edge. Mutate structure through
/// [`Forest`](crate::Forest) operations so back-references stay consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub data: NodeData,
    pub next: Slot,
    pub parent: Option<NodeId>,
    pub flags: WarningFlags,
}

impl Node {
    pub fn new(data: NodeData) -> Self {
        Self {
            data,
            next: None,
            parent: None,
            flags: WarningFlags::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(NodeData::TrackVectorStop.is_value());
        assert!(!NodeData::TrackVectorStop.is_statement());
        assert!(!NodeData::TrackVectorStop.takes_successor());

        assert!(!NodeData::program().is_statement());
        assert!(!NodeData::program().takes_successor());

        assert!(NodeData::loop_statement().is_statement());
        assert!(!NodeData::loop_statement().takes_successor());

        let crossing = NodeData::Crossing {
            action: CrossingAction::Open,
        };
        assert!(crossing.is_statement());
        assert!(crossing.takes_successor());
    }

    #[test]
    fn test_dynamic_arity_kinds() {
        assert!(NodeData::track_set().has_dynamic_arity());
        assert!(NodeData::parallel_dynamic().has_dynamic_arity());
        assert!(!NodeData::parallel_static().has_dynamic_arity());
        assert_eq!(NodeData::point_set().desired_arity(), Some(1));
        assert_eq!(NodeData::program().desired_arity(), None);
    }

    #[test]
    fn test_declared_slots() {
        let program = NodeData::program();
        assert_eq!(
            program.slots(),
            vec![(SlotRef::Body, SlotKind::Statement, None)]
        );

        let track = NodeData::track_set();
        assert_eq!(track.slot(SlotRef::Vector), Some((SlotKind::Value, None)));
        assert_eq!(track.slot(SlotRef::Body), None);

        // Unmaterialized dynamic branches declare no slots yet.
        let parallel = NodeData::parallel_dynamic();
        assert!(parallel.slots().is_empty());
    }

    #[test]
    fn test_set_slot_bounds() {
        let mut cond = NodeData::conditional_static();
        assert!(cond.set_slot(SlotRef::Branch(1), Some(NodeId(7))));
        assert!(!cond.set_slot(SlotRef::Branch(2), None));
        assert_eq!(
            cond.slot(SlotRef::Branch(1)),
            Some((SlotKind::Statement, Some(NodeId(7))))
        );
    }

    #[test]
    fn test_two_way_parse_roundtrip() {
        assert_eq!(Speed::parse("slow"), Some(Speed::Slow));
        assert_eq!(ContactEvent::parse("Pass"), Some(ContactEvent::Pass));
        assert_eq!(CrossingAction::parse("shut"), None);
        assert_eq!(PointPosition::Branch.as_str(), "branch");
    }
}
