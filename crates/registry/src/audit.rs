//! Read-only audit of every scope's ordering.

use fitreg_core::ordering::{RegistryStore, ScopeStats};
use fitreg_core::scope::{EntityKind, LinkKind, Scope};
use fitreg_db::locks::set_local_timeouts;
use fitreg_db::repositories::LinkRepo;
use fitreg_db::PgRegistryStore;
use serde::Serialize;

use crate::error::RegistryResult;
use crate::registry::Registry;

/// Ordering health of one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeReport {
    pub scope: Scope,
    pub stats: ScopeStats,
    /// Why the scope fails the check; `None` when it is healthy.
    pub violation: Option<String>,
}

impl ScopeReport {
    pub fn is_ok(&self) -> bool {
        self.violation.is_none()
    }
}

impl Registry {
    /// Check every global scope and every owner's list against the dense
    /// rank rules, from one consistent snapshot. Takes no locks.
    pub async fn verify_all(&self) -> RegistryResult<Vec<ScopeReport>> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        set_local_timeouts(
            &mut *tx,
            self.config().lock_timeout_ms,
            self.config().statement_timeout_ms,
        )
        .await?;

        let mut scopes: Vec<Scope> = EntityKind::ALL.iter().map(|&k| Scope::Global(k)).collect();
        for link in LinkKind::ALL {
            let owners = LinkRepo::distinct_owners(&mut *tx, link).await?;
            scopes.extend(owners.into_iter().map(|owner| Scope::PerOwner(link, owner)));
        }

        let mut reports = Vec::with_capacity(scopes.len());
        {
            let mut store = PgRegistryStore::new(&mut *tx);
            for scope in scopes {
                let stats = store.scope_stats(&scope).await?;
                let violation = stats.check(&scope).err().map(|e| e.to_string());
                if let Some(reason) = &violation {
                    tracing::error!(%scope, reason = %reason, "Scope failed ordering audit");
                }
                reports.push(ScopeReport {
                    scope,
                    stats,
                    violation,
                });
            }
        }
        tx.commit().await?;

        let failing = reports.iter().filter(|r| !r.is_ok()).count();
        tracing::info!(scopes = reports.len(), failing, "Ordering audit finished");
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_scope_and_violation() {
        let report = ScopeReport {
            scope: Scope::PerOwner(LinkKind::CategoryWorkout, 3),
            stats: ScopeStats {
                active: 2,
                distinct_sequences: 1,
                min_sequence: Some(1),
                max_sequence: Some(1),
                active_unsequenced: 0,
                inactive_sequenced: 0,
            },
            violation: Some("duplicate sequence".to_string()),
        };
        assert!(!report.is_ok());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["scope"], serde_json::json!({ "per_owner": ["category_workout", 3] }));
        assert_eq!(json["stats"]["active"], 2);
        assert_eq!(json["violation"], "duplicate sequence");
    }
}
