//! Guard layer: checks that run inside the transaction, after the scope
//! locks are held and before the sequence engine writes anything.

use fitreg_core::error::CoreError;
use fitreg_core::scope::{EntityKind, LinkKind, LinkSide};
use fitreg_core::types::DbId;
use fitreg_db::models::entity::EntityHeader;
use fitreg_db::models::link::LinkRow;
use fitreg_db::repositories::{EntityRepo, VideoRepo};
use sqlx::PgConnection;

use crate::error::RegistryResult;

/// Reject `name` when another active entity of `kind` already uses it
/// (trimmed, case-insensitive). `exclude_id` is the entity being renamed
/// or reactivated.
pub(crate) async fn ensure_name_available(
    conn: &mut PgConnection,
    kind: EntityKind,
    name: &str,
    exclude_id: Option<DbId>,
) -> RegistryResult<()> {
    if let Some(existing) =
        EntityRepo::find_active_name_collision(&mut *conn, kind, name, exclude_id).await?
    {
        tracing::warn!(kind = kind.as_str(), name, existing_id = existing.id, "Duplicate active name");
        return Err(CoreError::Conflict(format!(
            "An active {} named '{}' already exists (id {})",
            kind.as_str(),
            existing.name,
            existing.id
        ))
        .into());
    }
    Ok(())
}

/// Refuse a soft delete while active association rows still reference the
/// entity.
pub(crate) fn ensure_unreferenced(
    kind: EntityKind,
    id: DbId,
    referencing: &[(LinkKind, LinkRow)],
) -> Result<(), CoreError> {
    if referencing.is_empty() {
        return Ok(());
    }
    tracing::warn!(
        kind = kind.as_str(),
        id,
        links = referencing.len(),
        "Deletion blocked by active links"
    );
    Err(CoreError::Conflict(format!(
        "{} {id} still has {} active link(s); remove children first",
        kind.label(),
        referencing.len()
    )))
}

/// Load an entity that must exist and be active.
pub(crate) async fn require_active_entity(
    conn: &mut PgConnection,
    kind: EntityKind,
    id: DbId,
) -> RegistryResult<EntityHeader> {
    match EntityRepo::find_header(&mut *conn, kind, id).await? {
        Some(header) if header.is_active => Ok(header),
        _ => Err(not_found(kind.label(), id)),
    }
}

/// Key-share-lock the endpoints on one side of `link`, failing with
/// `NotFound` on the first id that is absent or inactive.
///
/// The lock keeps a concurrent soft delete of an endpoint (which takes
/// `FOR UPDATE`) waiting until this transaction ends.
pub(crate) async fn require_active_endpoints(
    conn: &mut PgConnection,
    link: LinkKind,
    side: LinkSide,
    ids: &[DbId],
) -> RegistryResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let (found, label) = match (link, side) {
        (_, LinkSide::Owner) => (
            EntityRepo::share_active(&mut *conn, link.owner_kind(), ids).await?,
            link.owner_label(),
        ),
        (LinkKind::CategoryWorkout, LinkSide::Member) => (
            EntityRepo::share_active(&mut *conn, EntityKind::Workout, ids).await?,
            link.member_label(),
        ),
        (LinkKind::WorkoutVideo, LinkSide::Member) => {
            (VideoRepo::share_active(&mut *conn, ids).await?, link.member_label())
        }
    };

    if let Some(&missing) = ids.iter().find(|id| !found.contains(id)) {
        tracing::warn!(link = link.as_str(), id = missing, "Link endpoint missing or inactive");
        return Err(not_found(label, missing));
    }
    Ok(())
}

pub(crate) fn not_found(entity: &'static str, id: DbId) -> crate::error::RegistryError {
    CoreError::NotFound { entity, id }.into()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn link_row(id: DbId, owner_id: DbId, member_id: DbId) -> LinkRow {
        LinkRow {
            id,
            owner_id,
            member_id,
            is_active: true,
            sequence: Some(1),
            created_by: None,
            updated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unreferenced_entity_passes() {
        assert!(ensure_unreferenced(EntityKind::Category, 1, &[]).is_ok());
    }

    #[test]
    fn referenced_entity_is_blocked() {
        let rows = vec![
            (LinkKind::CategoryWorkout, link_row(10, 3, 1)),
            (LinkKind::WorkoutVideo, link_row(11, 1, 8)),
        ];
        let err = ensure_unreferenced(EntityKind::Workout, 1, &rows).unwrap_err();
        match err {
            CoreError::Conflict(msg) => {
                assert!(msg.contains("Workout 1"));
                assert!(msg.contains("2 active link(s)"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
