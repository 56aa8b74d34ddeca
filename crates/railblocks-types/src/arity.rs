//! Dynamic-arity repetition groups.
//!
//! Dynamic-arity nodes (TrackSet, PointSet, LightSet, ConditionalDynamic,
//! ParallelDynamic) carry a numbered group of structurally identical
//! repetitions whose count the user adjusts one step at a time. The group is
//! an explicit state machine over `(desired, actual)` with a pure step
//! function, so the diffing logic is testable in isolation from any editing
//! or rendering concern.

use crate::node::NodeId;

/// The next move required to settle a group, as a pure function of the
/// desired and materialized counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityStep {
    /// Append one repetition with default (or retained) values.
    Grow,
    /// Remove the highest-numbered repetition, capturing its values.
    Shrink,
    /// `actual == desired`; nothing to do.
    Done,
}

/// Decide the next reconciliation step.
pub fn arity_step(desired: usize, actual: usize) -> ArityStep {
    use std::cmp::Ordering::*;
    match actual.cmp(&desired) {
        Less => ArityStep::Grow,
        Greater => ArityStep::Shrink,
        Equal => ArityStep::Done,
    }
}

/// One repetition of a dynamic-arity group.
pub trait Repetition: Clone {
    /// The value a freshly materialized repetition starts with.
    fn default_rep() -> Self;

    /// Called just before this repetition is removed. A repetition carrying
    /// a statement slot hands back the attached chain head here so the forest
    /// can re-root it as an orphan; the slot itself is never retained.
    fn on_remove(&mut self) -> Option<NodeId>;
}

/// A numbered repetition group with index-keyed value retention.
///
/// `reps.len()` is the materialized (actual) arity. Values of removed
/// repetitions are kept in `retained`, keyed by repetition index, so a
/// shrink/grow cycle restores them exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct RepGroup<T> {
    desired: usize,
    reps: Vec<T>,
    retained: Vec<T>,
}

impl<T: Repetition> RepGroup<T> {
    /// A new, unmaterialized group: `desired = 1`, `actual = 0`.
    ///
    /// This is also the load-time shape; [`reconcile`](Self::reconcile)
    /// materializes it.
    pub fn new() -> Self {
        Self {
            desired: 1,
            reps: Vec::new(),
            retained: Vec::new(),
        }
    }

    /// A settled group holding the given values (`desired == actual == len`,
    /// minimum 1).
    pub fn with_values(values: Vec<T>) -> Self {
        let mut group = Self {
            desired: values.len().max(1),
            reps: values,
            retained: Vec::new(),
        };
        group.reconcile();
        group
    }

    pub fn desired(&self) -> usize {
        self.desired
    }

    pub fn actual(&self) -> usize {
        self.reps.len()
    }

    pub fn is_settled(&self) -> bool {
        self.reps.len() == self.desired
    }

    /// Set the desired arity, clamped to a minimum of 1.
    pub fn set_desired(&mut self, n: usize) {
        self.desired = n.max(1);
    }

    /// Request one more repetition.
    pub fn increment(&mut self) {
        self.desired += 1;
    }

    /// Request one fewer repetition. A no-op at the minimum of 1.
    pub fn decrement(&mut self) {
        if self.desired > 1 {
            self.desired -= 1;
        }
    }

    /// The materialized repetitions, in index order.
    pub fn reps(&self) -> &[T] {
        &self.reps
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.reps.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.reps.get_mut(index)
    }

    /// Bring `actual` in line with `desired`, one repetition at a time.
    ///
    /// Growing restores the retained value for that index if one exists,
    /// otherwise materializes the default. Shrinking captures the removed
    /// value into the retention store. Idempotent: a settled group is left
    /// untouched.
    ///
    /// Returns the chain heads detached from removed repetitions; the caller
    /// re-roots them as orphans.
    pub fn reconcile(&mut self) -> Vec<NodeId> {
        let mut detached = Vec::new();
        loop {
            match arity_step(self.desired, self.reps.len()) {
                ArityStep::Done => break,
                ArityStep::Grow => {
                    let index = self.reps.len();
                    let value = self
                        .retained
                        .get(index)
                        .cloned()
                        .unwrap_or_else(T::default_rep);
                    self.reps.push(value);
                }
                ArityStep::Shrink => {
                    let Some(mut rep) = self.reps.pop() else {
                        break;
                    };
                    let index = self.reps.len();
                    if let Some(head) = rep.on_remove() {
                        detached.push(head);
                    }
                    if self.retained.len() <= index {
                        self.retained.resize_with(index + 1, T::default_rep);
                    }
                    self.retained[index] = rep;
                }
            }
        }
        detached
    }
}

impl<T: Repetition> Default for RepGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Scalar repetitions used by PointSet / LightSet.
impl Repetition for u32 {
    fn default_rep() -> Self {
        0
    }

    fn on_remove(&mut self) -> Option<NodeId> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_function() {
        assert_eq!(arity_step(3, 1), ArityStep::Grow);
        assert_eq!(arity_step(1, 3), ArityStep::Shrink);
        assert_eq!(arity_step(2, 2), ArityStep::Done);
    }

    #[test]
    fn test_new_group_materializes_to_one() {
        let mut group: RepGroup<u32> = RepGroup::new();
        assert_eq!(group.actual(), 0);
        assert_eq!(group.desired(), 1);
        group.reconcile();
        assert_eq!(group.actual(), 1);
        assert!(group.is_settled());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut group: RepGroup<u32> = RepGroup::new();
        group.set_desired(4);
        group.reconcile();
        let snapshot = group.reps().to_vec();
        group.reconcile();
        assert_eq!(group.reps(), snapshot.as_slice());
        assert_eq!(group.actual(), 4);
    }

    #[test]
    fn test_desired_clamped_to_one() {
        let mut group: RepGroup<u32> = RepGroup::new();
        group.set_desired(0);
        assert_eq!(group.desired(), 1);
        group.decrement();
        assert_eq!(group.desired(), 1);
    }

    #[test]
    fn test_value_retention_under_resize() {
        let mut group: RepGroup<u32> = RepGroup::with_values(vec![10, 20, 30]);
        group.set_desired(1);
        group.reconcile();
        assert_eq!(group.reps(), &[10]);

        group.set_desired(3);
        group.reconcile();
        assert_eq!(group.reps(), &[10, 20, 30]);
    }

    #[test]
    fn test_grow_past_retention_uses_defaults() {
        let mut group: RepGroup<u32> = RepGroup::with_values(vec![7]);
        group.set_desired(3);
        group.reconcile();
        assert_eq!(group.reps(), &[7, 0, 0]);
    }

    #[test]
    fn test_retention_keyed_by_index_not_identity() {
        let mut group: RepGroup<u32> = RepGroup::with_values(vec![1, 2, 3, 4]);
        group.set_desired(2);
        group.reconcile();
        // Overwrite a surviving repetition; retained values are untouched.
        *group.get_mut(1).unwrap() = 99;
        group.set_desired(4);
        group.reconcile();
        assert_eq!(group.reps(), &[1, 99, 3, 4]);
    }
}
