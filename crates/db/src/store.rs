//! PostgreSQL implementation of [`RegistryStore`].
//!
//! Operates on a borrowed connection, normally the one inside an open
//! transaction; committing or rolling back is the caller's job.

use async_trait::async_trait;
use fitreg_core::error::CoreError;
use fitreg_core::ordering::{RegistryStore, ScopeStats, SlotState};
use fitreg_core::scope::Scope;
use fitreg_core::types::{DbId, Sequence};
use sqlx::PgConnection;

use crate::errors::to_core_error;
use crate::tables::ScopeTarget;

/// Registry store bound to one connection.
pub struct PgRegistryStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgRegistryStore<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

/// Store failures keep their class: transient errors stay retryable,
/// `uq_*` violations become conflicts and the rest are internal.
fn store_error(scope: &Scope, op: &'static str, err: sqlx::Error) -> CoreError {
    let core = to_core_error(&format!("{op} on {scope} failed"), &err);
    tracing::warn!(%scope, op, error = %err, retryable = core.is_retryable(), "Registry store operation failed");
    core
}

#[async_trait]
impl RegistryStore for PgRegistryStore<'_> {
    async fn max_active_sequence(&mut self, scope: &Scope) -> Result<Sequence, CoreError> {
        let target = ScopeTarget::of(scope);
        let query = format!(
            "SELECT COALESCE(MAX(sequence), 0) FROM {} WHERE is_active AND {}",
            target.table,
            target.owner_clause(1)
        );
        sqlx::query_scalar::<_, Sequence>(&query)
            .bind(target.owner_id())
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| store_error(scope, "max_active_sequence", e))
    }

    async fn count_active(&mut self, scope: &Scope) -> Result<Sequence, CoreError> {
        let target = ScopeTarget::of(scope);
        let query = format!(
            "SELECT COUNT(*) FROM {} WHERE is_active AND {}",
            target.table,
            target.owner_clause(1)
        );
        let count = sqlx::query_scalar::<_, i64>(&query)
            .bind(target.owner_id())
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| store_error(scope, "count_active", e))?;
        Sequence::try_from(count)
            .map_err(|_| CoreError::Internal(format!("Scope {scope} has {count} active rows")))
    }

    async fn shift_range(
        &mut self,
        scope: &Scope,
        lo: Sequence,
        hi: Sequence,
        delta: Sequence,
    ) -> Result<u64, CoreError> {
        if lo > hi || delta == 0 {
            return Ok(0);
        }
        let target = ScopeTarget::of(scope);
        let query = format!(
            "UPDATE {} SET sequence = sequence + $1 \
             WHERE is_active AND sequence BETWEEN $2 AND $3 AND {}",
            target.table,
            target.owner_clause(4)
        );
        let result = sqlx::query(&query)
            .bind(delta)
            .bind(lo)
            .bind(hi)
            .bind(target.owner_id())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| store_error(scope, "shift_range", e))?;
        tracing::debug!(%scope, lo, hi, delta, rows = result.rows_affected(), "Shifted range");
        Ok(result.rows_affected())
    }

    async fn slot(&mut self, scope: &Scope, id: DbId) -> Result<Option<SlotState>, CoreError> {
        let target = ScopeTarget::of(scope);
        let query = format!(
            "SELECT is_active, sequence FROM {} WHERE id = $1 AND {}",
            target.table,
            target.owner_clause(2)
        );
        let row = sqlx::query_as::<_, (bool, Option<Sequence>)>(&query)
            .bind(id)
            .bind(target.owner_id())
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(|e| store_error(scope, "slot", e))?;
        Ok(row.map(|(is_active, sequence)| SlotState {
            is_active,
            sequence,
        }))
    }

    async fn set_sequence(
        &mut self,
        scope: &Scope,
        id: DbId,
        sequence: Option<Sequence>,
    ) -> Result<(), CoreError> {
        let target = ScopeTarget::of(scope);
        let query = format!(
            "UPDATE {} SET sequence = $2 WHERE id = $1 AND {}",
            target.table,
            target.owner_clause(3)
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(sequence)
            .bind(target.owner_id())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| store_error(scope, "set_sequence", e))?;
        require_row(scope, id, result.rows_affected())
    }

    async fn set_active(
        &mut self,
        scope: &Scope,
        id: DbId,
        active: bool,
    ) -> Result<(), CoreError> {
        let target = ScopeTarget::of(scope);
        let query = format!(
            "UPDATE {} SET is_active = $2 WHERE id = $1 AND {}",
            target.table,
            target.owner_clause(3)
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(active)
            .bind(target.owner_id())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| store_error(scope, "set_active", e))?;
        require_row(scope, id, result.rows_affected())
    }

    async fn scope_stats(&mut self, scope: &Scope) -> Result<ScopeStats, CoreError> {
        let target = ScopeTarget::of(scope);
        let query = format!(
            "SELECT \
                COUNT(*) FILTER (WHERE is_active), \
                COUNT(DISTINCT sequence) FILTER (WHERE is_active), \
                MIN(sequence) FILTER (WHERE is_active), \
                MAX(sequence) FILTER (WHERE is_active), \
                COUNT(*) FILTER (WHERE is_active AND sequence IS NULL), \
                COUNT(*) FILTER (WHERE NOT is_active AND sequence IS NOT NULL) \
             FROM {} WHERE {}",
            target.table,
            target.owner_clause(1)
        );
        let (
            active,
            distinct_sequences,
            min_sequence,
            max_sequence,
            active_unsequenced,
            inactive_sequenced,
        ) = sqlx::query_as::<_, (i64, i64, Option<Sequence>, Option<Sequence>, i64, i64)>(&query)
            .bind(target.owner_id())
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| store_error(scope, "scope_stats", e))?;
        Ok(ScopeStats {
            active,
            distinct_sequences,
            min_sequence,
            max_sequence,
            active_unsequenced,
            inactive_sequenced,
        })
    }
}

fn require_row(scope: &Scope, id: DbId, rows: u64) -> Result<(), CoreError> {
    if rows == 0 {
        return Err(CoreError::NotFound {
            entity: scope.member_label(),
            id,
        });
    }
    Ok(())
}
