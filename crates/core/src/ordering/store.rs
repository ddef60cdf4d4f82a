//! The persistence seam under the sequence engine.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::scope::Scope;
use crate::types::{DbId, Sequence};

/// Active flag and position of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotState {
    pub is_active: bool,
    pub sequence: Option<Sequence>,
}

/// Aggregates over one scope, enough to decide whether it is densely ranked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScopeStats {
    /// Active rows.
    pub active: i64,
    /// Distinct non-null sequences among active rows.
    pub distinct_sequences: i64,
    pub min_sequence: Option<Sequence>,
    pub max_sequence: Option<Sequence>,
    /// Active rows whose sequence is null.
    pub active_unsequenced: i64,
    /// Inactive rows whose sequence is not null.
    pub inactive_sequenced: i64,
}

impl ScopeStats {
    /// Whether the active sequences are exactly `1..=active`.
    pub fn is_dense(&self) -> bool {
        if self.active_unsequenced != 0 || self.distinct_sequences != self.active {
            return false;
        }
        if self.active == 0 {
            return self.max_sequence.is_none();
        }
        self.min_sequence == Some(1) && self.max_sequence.map(i64::from) == Some(self.active)
    }

    /// Fail with `Internal` unless the scope is dense and every inactive row
    /// has a null sequence.
    pub fn check(&self, scope: &Scope) -> Result<(), CoreError> {
        if !self.is_dense() {
            return Err(CoreError::Internal(format!(
                "Scope {scope} is not densely ranked: {} active rows, {} distinct sequences, \
                 range {:?}..={:?}, {} unsequenced",
                self.active,
                self.distinct_sequences,
                self.min_sequence,
                self.max_sequence,
                self.active_unsequenced,
            )));
        }
        if self.inactive_sequenced != 0 {
            return Err(CoreError::Internal(format!(
                "Scope {scope} has {} inactive rows that still carry a sequence",
                self.inactive_sequenced
            )));
        }
        Ok(())
    }
}

/// Point writes and range shifts for position-bearing rows.
///
/// Implementations execute exactly what they are asked; ordering rules live
/// in [`crate::ordering::engine`]. Every method is scoped: a row id that does
/// not belong to `scope` is treated as absent.
#[async_trait]
pub trait RegistryStore: Send {
    /// Highest active sequence in the scope, 0 when empty.
    async fn max_active_sequence(&mut self, scope: &Scope) -> Result<Sequence, CoreError>;

    /// Number of active rows in the scope.
    async fn count_active(&mut self, scope: &Scope) -> Result<Sequence, CoreError>;

    /// Add `delta` to the sequence of every active row with
    /// `lo <= sequence <= hi`. An empty range touches nothing.
    async fn shift_range(
        &mut self,
        scope: &Scope,
        lo: Sequence,
        hi: Sequence,
        delta: Sequence,
    ) -> Result<u64, CoreError>;

    /// Active flag and sequence of a row, `None` if absent from the scope.
    async fn slot(&mut self, scope: &Scope, id: DbId) -> Result<Option<SlotState>, CoreError>;

    async fn set_sequence(
        &mut self,
        scope: &Scope,
        id: DbId,
        sequence: Option<Sequence>,
    ) -> Result<(), CoreError>;

    async fn set_active(&mut self, scope: &Scope, id: DbId, active: bool)
        -> Result<(), CoreError>;

    /// Aggregates used by the dense-rank check.
    async fn scope_stats(&mut self, scope: &Scope) -> Result<ScopeStats, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::EntityKind;

    fn stats(active: i64, distinct: i64, min: Option<i32>, max: Option<i32>) -> ScopeStats {
        ScopeStats {
            active,
            distinct_sequences: distinct,
            min_sequence: min,
            max_sequence: max,
            active_unsequenced: 0,
            inactive_sequenced: 0,
        }
    }

    #[test]
    fn empty_scope_is_dense() {
        assert!(ScopeStats::default().is_dense());
    }

    #[test]
    fn contiguous_scope_is_dense() {
        assert!(stats(4, 4, Some(1), Some(4)).is_dense());
    }

    #[test]
    fn gap_is_detected() {
        assert!(!stats(3, 3, Some(1), Some(4)).is_dense());
    }

    #[test]
    fn duplicate_is_detected() {
        assert!(!stats(3, 2, Some(1), Some(2)).is_dense());
    }

    #[test]
    fn offset_start_is_detected() {
        assert!(!stats(2, 2, Some(2), Some(3)).is_dense());
    }

    #[test]
    fn active_row_without_sequence_is_detected() {
        let mut s = stats(2, 1, Some(1), Some(1));
        s.active_unsequenced = 1;
        assert!(!s.is_dense());
    }

    #[test]
    fn inactive_row_with_sequence_fails_check() {
        let mut s = stats(1, 1, Some(1), Some(1));
        s.inactive_sequenced = 1;
        assert!(s.is_dense());
        let err = s.check(&Scope::Global(EntityKind::Category)).unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }
}
