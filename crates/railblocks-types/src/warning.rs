//! Warning annotations attached to nodes by the static analyses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of an advisory warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// The node is not reachable from the entry root and will only appear in
    /// the commented-out orphan block.
    Unused,
    /// A Parallel/Conditional subtree contains a Loop node, so statements
    /// sequenced after it are (conditionally) unreachable.
    LoopInside,
    /// The node declares a slot that is currently empty; the generator will
    /// degrade output for it.
    Unconnected,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unused => write!(f, "unused"),
            Self::LoopInside => write!(f, "loop_inside"),
            Self::Unconnected => write!(f, "unconnected"),
        }
    }
}

/// Per-node warning state.
///
/// Each flag doubles as the "already annotated" latch the analyses use to
/// avoid redundant re-annotation; the passes always bring the flags back in
/// line with current truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarningFlags {
    pub unused: bool,
    pub loop_inside: bool,
    pub unconnected: bool,
}

impl WarningFlags {
    /// Iterate over the warning kinds currently set.
    pub fn kinds(self) -> impl Iterator<Item = WarningKind> {
        [
            (self.unused, WarningKind::Unused),
            (self.loop_inside, WarningKind::LoopInside),
            (self.unconnected, WarningKind::Unconnected),
        ]
        .into_iter()
        .filter_map(|(set, kind)| set.then_some(kind))
    }

    pub fn is_clear(self) -> bool {
        !self.unused && !self.loop_inside && !self.unconnected
    }
}
