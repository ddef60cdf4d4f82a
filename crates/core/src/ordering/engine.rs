//! Dense-rank maintenance over a [`RegistryStore`].
//!
//! Every function assumes the caller holds the scope's lock inside one
//! transaction; intermediate states (duplicate sequences during a shift) are
//! never meant to be observed.

use serde::Serialize;

use crate::error::CoreError;
use crate::ordering::slots::{clamp_insert_position, clamp_move_position};
use crate::ordering::store::{RegistryStore, ScopeStats};
use crate::scope::Scope;
use crate::types::{DbId, Sequence};

/// Result of [`move_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub from: Sequence,
    pub to: Sequence,
}

impl MoveOutcome {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Next end-of-list slot of `scope`. The caller writes it to the new row.
pub async fn append<S>(store: &mut S, scope: &Scope) -> Result<Sequence, CoreError>
where
    S: RegistryStore + ?Sized,
{
    let seq = store.max_active_sequence(scope).await? + 1;
    tracing::debug!(%scope, seq, "Append slot");
    Ok(seq)
}

/// Open a slot at `desired` (clamped to `[1, count + 1]`) by shifting the
/// tail down one place. The caller writes the returned slot to the new row.
pub async fn insert_at<S>(
    store: &mut S,
    scope: &Scope,
    desired: Sequence,
) -> Result<Sequence, CoreError>
where
    S: RegistryStore + ?Sized,
{
    let count = store.count_active(scope).await?;
    let slot = clamp_insert_position(desired, count);
    let shifted = store.shift_range(scope, slot, count, 1).await?;
    tracing::debug!(%scope, desired, slot, shifted, "Insert slot");
    Ok(slot)
}

/// Move an active row to `desired` (clamped to `[1, count]`), shifting the
/// rows in between by one place.
pub async fn move_to<S>(
    store: &mut S,
    scope: &Scope,
    id: DbId,
    desired: Sequence,
) -> Result<MoveOutcome, CoreError>
where
    S: RegistryStore + ?Sized,
{
    let from = active_sequence(store, scope, id).await?;
    let count = store.count_active(scope).await?;
    let to = clamp_move_position(desired, count);

    if to == from {
        tracing::debug!(%scope, id, from, "Move is a no-op");
        return Ok(MoveOutcome { from, to });
    }

    if to > from {
        store.shift_range(scope, from + 1, to, -1).await?;
    } else {
        store.shift_range(scope, to, from - 1, 1).await?;
    }
    store.set_sequence(scope, id, Some(to)).await?;

    tracing::debug!(%scope, id, from, to, "Moved");
    Ok(MoveOutcome { from, to })
}

/// Deactivate a row, null its sequence and close the gap it leaves.
///
/// Returns the sequence the row held.
pub async fn soft_delete_compact<S>(
    store: &mut S,
    scope: &Scope,
    id: DbId,
) -> Result<Sequence, CoreError>
where
    S: RegistryStore + ?Sized,
{
    let old = active_sequence(store, scope, id).await?;
    let count_before = store.count_active(scope).await?;

    store.set_active(scope, id, false).await?;
    store.set_sequence(scope, id, None).await?;
    let shifted = store.shift_range(scope, old + 1, count_before, -1).await?;

    tracing::debug!(%scope, id, old, shifted, "Soft-deleted and compacted");
    Ok(old)
}

/// Re-activate an inactive row at the current end of its scope.
///
/// The row's previous position is not restored.
pub async fn reactivate<S>(store: &mut S, scope: &Scope, id: DbId) -> Result<Sequence, CoreError>
where
    S: RegistryStore + ?Sized,
{
    let state = store.slot(scope, id).await?.ok_or(CoreError::NotFound {
        entity: scope.member_label(),
        id,
    })?;
    if state.is_active {
        return Err(CoreError::Conflict(format!(
            "{} {id} is already active",
            scope.member_label()
        )));
    }

    let seq = append(store, scope).await?;
    reactivate_at(store, scope, id, seq).await?;
    Ok(seq)
}

/// Re-activate a row into a slot the caller already claimed (see
/// [`NextSlots`](crate::ordering::NextSlots)).
pub async fn reactivate_at<S>(
    store: &mut S,
    scope: &Scope,
    id: DbId,
    slot: Sequence,
) -> Result<(), CoreError>
where
    S: RegistryStore + ?Sized,
{
    store.set_active(scope, id, true).await?;
    store.set_sequence(scope, id, Some(slot)).await?;
    tracing::debug!(%scope, id, slot, "Reactivated");
    Ok(())
}

/// Check that `scope` is densely ranked and that inactive rows carry no
/// sequence. A failure means a bug in the engine or an out-of-band write.
pub async fn verify_dense<S>(store: &mut S, scope: &Scope) -> Result<ScopeStats, CoreError>
where
    S: RegistryStore + ?Sized,
{
    let stats = store.scope_stats(scope).await?;
    if let Err(err) = stats.check(scope) {
        tracing::error!(%scope, ?stats, "Dense-rank invariant violated");
        return Err(err);
    }
    Ok(stats)
}

/// Sequence of an active row, or `NotFound`.
async fn active_sequence<S>(store: &mut S, scope: &Scope, id: DbId) -> Result<Sequence, CoreError>
where
    S: RegistryStore + ?Sized,
{
    let not_found = CoreError::NotFound {
        entity: scope.member_label(),
        id,
    };
    match store.slot(scope, id).await? {
        Some(state) if state.is_active => state.sequence.ok_or_else(|| {
            CoreError::Internal(format!(
                "Active {} {id} in scope {scope} has no sequence",
                scope.member_label()
            ))
        }),
        _ => Err(not_found),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
