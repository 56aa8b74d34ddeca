//! Advisory analyses over the RailBlocks node forest.
//!
//! Three independent passes annotate nodes with warning flags:
//!
//! - [`mark_unused`] — nodes not reachable from the entry root
//! - [`mark_warnings`] — Parallel/Conditional subtrees containing a Loop
//! - [`mark_unconnected`] — nodes with an empty declared slot
//!
//! All passes are state-based and idempotent: they compute current truth and
//! bring the flags in line with it, so running a pass twice never changes the
//! result. None of them affects code generation.

mod loops;
mod unconnected;
mod unused;

pub use loops::{contains_loop, mark_warnings};
pub use unconnected::mark_unconnected;
pub use unused::mark_unused;
