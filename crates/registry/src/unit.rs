//! One structural transaction.
//!
//! A [`UnitOfWork`] opens a transaction with per-transaction timeouts,
//! takes scope locks in key order, and, before committing, re-checks dense
//! ranking of every scope it locked. Dropping it without committing rolls
//! everything back.

use std::collections::BTreeSet;

use fitreg_core::ordering::engine;
use fitreg_core::scope::Scope;
use fitreg_core::types::Sequence;
use fitreg_db::locks::{set_local_timeouts, ScopeLocks};
use fitreg_db::{DbPool, PgRegistryStore};
use sqlx::{PgConnection, Postgres, Transaction};

use crate::config::RegistryConfig;
use crate::error::RegistryResult;

pub(crate) struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
    locks: ScopeLocks,
    touched: BTreeSet<Scope>,
}

impl UnitOfWork {
    pub(crate) async fn begin(pool: &DbPool, config: &RegistryConfig) -> RegistryResult<Self> {
        let mut tx = pool.begin().await?;
        set_local_timeouts(&mut *tx, config.lock_timeout_ms, config.statement_timeout_ms).await?;
        Ok(Self {
            tx,
            locks: ScopeLocks::new(),
            touched: BTreeSet::new(),
        })
    }

    /// Lock `scopes` (those not yet held) and mark them for verification.
    ///
    /// Scopes discovered after the first call are locked late, out of global
    /// key order; a resulting deadlock aborts with SQLSTATE `40P01`, which
    /// surfaces as a retryable error.
    pub(crate) async fn lock(&mut self, scopes: impl IntoIterator<Item = Scope>) -> RegistryResult<()> {
        let scopes: Vec<Scope> = scopes.into_iter().collect();
        self.locks
            .acquire(&mut *self.tx, scopes.iter().copied())
            .await?;
        self.touched.extend(scopes);
        Ok(())
    }

    pub(crate) fn conn(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }

    pub(crate) fn store(&mut self) -> PgRegistryStore<'_> {
        PgRegistryStore::new(&mut *self.tx)
    }

    /// Claim a slot in `scope`: the end of the list, or `position` (clamped)
    /// with the tail shifted down.
    pub(crate) async fn claim_slot(
        &mut self,
        scope: &Scope,
        position: Option<Sequence>,
    ) -> RegistryResult<Sequence> {
        let mut store = self.store();
        let slot = match position {
            None => engine::append(&mut store, scope).await?,
            Some(desired) => engine::insert_at(&mut store, scope, desired).await?,
        };
        Ok(slot)
    }

    /// Verify every locked scope (when `verify` is set) and commit.
    pub(crate) async fn commit(mut self, verify: bool) -> RegistryResult<()> {
        if verify {
            let mut store = PgRegistryStore::new(&mut *self.tx);
            for scope in &self.touched {
                engine::verify_dense(&mut store, scope).await?;
            }
        }
        self.tx.commit().await?;
        Ok(())
    }

    /// Roll back explicitly, used when an operation turns out to be a no-op.
    pub(crate) async fn rollback(self) -> RegistryResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
