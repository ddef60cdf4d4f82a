//! Membership diffing for many-to-many synchronization.
//!
//! [`plan_sync`] splits a desired id set against the currently active one.
//! Kept ids are reported but never written, so their positions survive
//! unrelated membership edits.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::types::DbId;

/// The three-way split between current and desired membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    /// Currently active, not desired.
    pub to_remove: Vec<DbId>,
    /// Active and desired; left untouched.
    pub to_keep: Vec<DbId>,
    /// Desired, not currently active.
    pub to_add: Vec<DbId>,
}

impl SyncPlan {
    /// True when applying the plan would write nothing.
    pub fn is_noop(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }
}

/// Compute the set difference between `current` and `desired`.
///
/// Both inputs may contain duplicates. `to_remove` and `to_keep` are sorted
/// ascending; `to_add` keeps the order of first appearance in `desired`, so
/// new members are appended in the order the caller listed them.
pub fn plan_sync(current: &[DbId], desired: &[DbId]) -> SyncPlan {
    let current: BTreeSet<DbId> = current.iter().copied().collect();
    let desired_set: BTreeSet<DbId> = desired.iter().copied().collect();

    let mut seen = BTreeSet::new();
    let to_add = desired
        .iter()
        .copied()
        .filter(|id| !current.contains(id) && seen.insert(*id))
        .collect();

    SyncPlan {
        to_remove: current.difference(&desired_set).copied().collect(),
        to_keep: current.intersection(&desired_set).copied().collect(),
        to_add,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_remove_keep_add() {
        let plan = plan_sync(&[1, 2], &[2, 3]);
        assert_eq!(plan.to_remove, vec![1]);
        assert_eq!(plan.to_keep, vec![2]);
        assert_eq!(plan.to_add, vec![3]);
        assert!(!plan.is_noop());
    }

    #[test]
    fn identical_sets_are_noop() {
        let plan = plan_sync(&[5, 3, 9], &[9, 5, 3]);
        assert!(plan.is_noop());
        assert_eq!(plan.to_keep, vec![3, 5, 9]);
    }

    #[test]
    fn duplicates_in_desired_are_collapsed() {
        let plan = plan_sync(&[], &[4, 4, 2]);
        assert_eq!(plan.to_add, vec![4, 2]);
    }

    #[test]
    fn additions_keep_caller_order() {
        let plan = plan_sync(&[1], &[9, 1, 3, 7]);
        assert_eq!(plan.to_add, vec![9, 3, 7]);
        assert_eq!(plan.to_keep, vec![1]);
    }

    #[test]
    fn empty_desired_removes_everything() {
        let plan = plan_sync(&[7, 8], &[]);
        assert_eq!(plan.to_remove, vec![7, 8]);
        assert!(plan.to_keep.is_empty());
        assert!(plan.to_add.is_empty());
    }

    #[test]
    fn both_empty_is_noop() {
        assert!(plan_sync(&[], &[]).is_noop());
    }
}
