//! In-process [`RegistryStore`] for exercising the engine without a database.
//!
//! Not transactional; callers that need rollback semantics use the
//! PostgreSQL store.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::ordering::store::{RegistryStore, ScopeStats, SlotState};
use crate::scope::Scope;
use crate::types::{DbId, Sequence};

#[derive(Debug, Clone)]
struct MemRow {
    scope: Scope,
    is_active: bool,
    sequence: Option<Sequence>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: BTreeMap<DbId, MemRow>,
    next_id: DbId,
    writes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row verbatim and return its id. Does not count as a write.
    pub fn insert(&mut self, scope: Scope, is_active: bool, sequence: Option<Sequence>) -> DbId {
        self.next_id += 1;
        self.rows.insert(
            self.next_id,
            MemRow {
                scope,
                is_active,
                sequence,
            },
        );
        self.next_id
    }

    /// Seed `n` active rows at positions `1..=n` and return their ids in order.
    pub fn seed(&mut self, scope: Scope, n: Sequence) -> Vec<DbId> {
        (1..=n).map(|seq| self.insert(scope, true, Some(seq))).collect()
    }

    /// Active row ids of a scope ordered by sequence.
    pub fn ordered(&self, scope: &Scope) -> Vec<DbId> {
        let mut active: Vec<(Sequence, DbId)> = self
            .rows
            .iter()
            .filter(|(_, row)| row.scope == *scope && row.is_active)
            .map(|(&id, row)| (row.sequence.unwrap_or(Sequence::MAX), id))
            .collect();
        active.sort();
        active.into_iter().map(|(_, id)| id).collect()
    }

    pub fn sequence(&self, id: DbId) -> Option<Sequence> {
        self.rows.get(&id).and_then(|row| row.sequence)
    }

    pub fn is_active(&self, id: DbId) -> bool {
        self.rows.get(&id).is_some_and(|row| row.is_active)
    }

    /// Number of mutating calls that changed at least one row.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    fn row_mut(&mut self, scope: &Scope, id: DbId) -> Result<&mut MemRow, CoreError> {
        self.rows
            .get_mut(&id)
            .filter(|row| row.scope == *scope)
            .ok_or(CoreError::NotFound {
                entity: scope.member_label(),
                id,
            })
    }

    fn active_in<'a>(&'a self, scope: &'a Scope) -> impl Iterator<Item = &'a MemRow> + 'a {
        self.rows
            .values()
            .filter(move |row| row.scope == *scope && row.is_active)
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn max_active_sequence(&mut self, scope: &Scope) -> Result<Sequence, CoreError> {
        Ok(self
            .active_in(scope)
            .filter_map(|row| row.sequence)
            .max()
            .unwrap_or(0))
    }

    async fn count_active(&mut self, scope: &Scope) -> Result<Sequence, CoreError> {
        let count = self.active_in(scope).count();
        Sequence::try_from(count)
            .map_err(|_| CoreError::Internal(format!("Scope {scope} has {count} rows")))
    }

    async fn shift_range(
        &mut self,
        scope: &Scope,
        lo: Sequence,
        hi: Sequence,
        delta: Sequence,
    ) -> Result<u64, CoreError> {
        if lo > hi {
            return Ok(0);
        }
        let mut touched = 0;
        for row in self.rows.values_mut() {
            if row.scope != *scope || !row.is_active {
                continue;
            }
            if let Some(seq) = row.sequence.as_mut() {
                if (lo..=hi).contains(seq) {
                    *seq += delta;
                    touched += 1;
                }
            }
        }
        if touched > 0 {
            self.writes += 1;
        }
        Ok(touched)
    }

    async fn slot(&mut self, scope: &Scope, id: DbId) -> Result<Option<SlotState>, CoreError> {
        Ok(self
            .rows
            .get(&id)
            .filter(|row| row.scope == *scope)
            .map(|row| SlotState {
                is_active: row.is_active,
                sequence: row.sequence,
            }))
    }

    async fn set_sequence(
        &mut self,
        scope: &Scope,
        id: DbId,
        sequence: Option<Sequence>,
    ) -> Result<(), CoreError> {
        self.row_mut(scope, id)?.sequence = sequence;
        self.writes += 1;
        Ok(())
    }

    async fn set_active(
        &mut self,
        scope: &Scope,
        id: DbId,
        active: bool,
    ) -> Result<(), CoreError> {
        self.row_mut(scope, id)?.is_active = active;
        self.writes += 1;
        Ok(())
    }

    async fn scope_stats(&mut self, scope: &Scope) -> Result<ScopeStats, CoreError> {
        let mut stats = ScopeStats::default();
        let mut seen = std::collections::BTreeSet::new();
        for row in self.rows.values().filter(|row| row.scope == *scope) {
            match (row.is_active, row.sequence) {
                (true, Some(seq)) => {
                    stats.active += 1;
                    seen.insert(seq);
                }
                (true, None) => {
                    stats.active += 1;
                    stats.active_unsequenced += 1;
                }
                (false, Some(_)) => stats.inactive_sequenced += 1,
                (false, None) => {}
            }
        }
        stats.distinct_sequences = seen.len() as i64;
        stats.min_sequence = seen.first().copied();
        stats.max_sequence = seen.last().copied();
        Ok(stats)
    }
}
