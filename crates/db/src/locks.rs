//! Transaction-scoped advisory locks, one per scope.
//!
//! Locks are released automatically at commit or rollback. Acquiring them
//! in ascending [`Scope::lock_key`] order keeps concurrent writers that
//! touch overlapping scopes from deadlocking.

use std::collections::BTreeSet;

use fitreg_core::scope::{lock_order, Scope};
use sqlx::PgConnection;

/// Apply per-transaction timeouts. Must run inside a transaction.
pub async fn set_local_timeouts(
    conn: &mut PgConnection,
    lock_timeout_ms: u64,
    statement_timeout_ms: u64,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT set_config('lock_timeout', $1, true), set_config('statement_timeout', $2, true)")
        .bind(format!("{lock_timeout_ms}ms"))
        .bind(format!("{statement_timeout_ms}ms"))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// The scope locks held by one transaction.
#[derive(Debug, Default)]
pub struct ScopeLocks {
    held: BTreeSet<i64>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every scope not yet held, in key order. Returns how many new
    /// locks were taken.
    pub async fn acquire(
        &mut self,
        conn: &mut PgConnection,
        scopes: impl IntoIterator<Item = Scope>,
    ) -> Result<usize, sqlx::Error> {
        let mut taken = 0;
        for scope in lock_order(scopes) {
            let key = scope.lock_key();
            if self.held.contains(&key) {
                continue;
            }
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(key)
                .execute(&mut *conn)
                .await?;
            tracing::debug!(%scope, key, "Acquired scope lock");
            self.held.insert(key);
            taken += 1;
        }
        Ok(taken)
    }

    pub fn holds(&self, scope: &Scope) -> bool {
        self.held.contains(&scope.lock_key())
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}
