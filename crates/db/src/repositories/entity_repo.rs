//! Kind-independent queries over the sequenced entity tables
//! (`categories`, `workouts`).

use fitreg_core::scope::EntityKind;
use fitreg_core::types::DbId;
use sqlx::{PgConnection, PgExecutor};

use crate::models::entity::EntityHeader;
use crate::tables::entity_table;

/// Column list shared across header queries.
const HEADER_COLUMNS: &str = "id, name, is_active, sequence";

/// Provides name, activation and row-lock queries for any [`EntityKind`].
pub struct EntityRepo;

impl EntityRepo {
    /// Find an entity header by id, active or not.
    pub async fn find_header<'e>(
        executor: impl PgExecutor<'e>,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Option<EntityHeader>, sqlx::Error> {
        let query = format!(
            "SELECT {HEADER_COLUMNS} FROM {} WHERE id = $1",
            entity_table(kind)
        );
        sqlx::query_as::<_, EntityHeader>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List active entity headers in sequence order.
    pub async fn list_active_headers<'e>(
        executor: impl PgExecutor<'e>,
        kind: EntityKind,
    ) -> Result<Vec<EntityHeader>, sqlx::Error> {
        let query = format!(
            "SELECT {HEADER_COLUMNS} FROM {} WHERE is_active ORDER BY sequence, id",
            entity_table(kind)
        );
        sqlx::query_as::<_, EntityHeader>(&query)
            .fetch_all(executor)
            .await
    }

    /// Find an active entity whose `lower(btrim(name))` equals `name`'s,
    /// optionally ignoring one id (the entity being renamed).
    ///
    /// Both sides are normalized in SQL, with the same expression as the
    /// `uq_*_active_name` indexes.
    pub async fn find_active_name_collision<'e>(
        executor: impl PgExecutor<'e>,
        kind: EntityKind,
        name: &str,
        exclude_id: Option<DbId>,
    ) -> Result<Option<EntityHeader>, sqlx::Error> {
        let query = format!(
            "SELECT {HEADER_COLUMNS} FROM {} \
             WHERE is_active AND lower(btrim(name)) = lower(btrim($1)) \
               AND ($2::BIGINT IS NULL OR id <> $2) \
             LIMIT 1",
            entity_table(kind)
        );
        sqlx::query_as::<_, EntityHeader>(&query)
            .bind(name)
            .bind(exclude_id)
            .fetch_optional(executor)
            .await
    }

    /// Rename an active entity. Returns `None` if no active row has `id`.
    pub async fn rename<'e>(
        executor: impl PgExecutor<'e>,
        kind: EntityKind,
        id: DbId,
        name: &str,
        updated_by: Option<DbId>,
    ) -> Result<Option<EntityHeader>, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET name = $2, updated_by = COALESCE($3, updated_by) \
             WHERE id = $1 AND is_active \
             RETURNING {HEADER_COLUMNS}",
            entity_table(kind)
        );
        sqlx::query_as::<_, EntityHeader>(&query)
            .bind(id)
            .bind(name)
            .bind(updated_by)
            .fetch_optional(executor)
            .await
    }

    /// Lock an entity row against concurrent link changes and return its
    /// header. Used before soft-deleting the entity.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Option<EntityHeader>, sqlx::Error> {
        let query = format!(
            "SELECT {HEADER_COLUMNS} FROM {} WHERE id = $1 FOR UPDATE",
            entity_table(kind)
        );
        sqlx::query_as::<_, EntityHeader>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Key-share-lock the active rows among `ids`, returning the ids found.
    ///
    /// Held by link operations so that an endpoint cannot be soft-deleted
    /// (which takes `FOR UPDATE`) while a link to it is being written.
    /// Sequence shifts on the same rows are not blocked.
    pub async fn share_active(
        conn: &mut PgConnection,
        kind: EntityKind,
        ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let query = format!(
            "SELECT id FROM {} WHERE id = ANY($1) AND is_active ORDER BY id FOR KEY SHARE",
            entity_table(kind)
        );
        sqlx::query_scalar::<_, DbId>(&query)
            .bind(ids)
            .fetch_all(conn)
            .await
    }
}
