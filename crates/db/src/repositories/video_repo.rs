//! Repository for the `videos` table.

use fitreg_core::types::DbId;
use sqlx::{PgConnection, PgExecutor};

use crate::models::video::{NewVideo, Video};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, storage_key, is_active, created_by, updated_by, \
    created_at, updated_at";

const JOINED_COLUMNS: &str = "v.id, v.title, v.storage_key, v.is_active, v.created_by, \
    v.updated_by, v.created_at, v.updated_at";

/// Provides operations for video asset references.
pub struct VideoRepo;

impl VideoRepo {
    /// Register a video, returning the created row.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: &NewVideo,
    ) -> Result<Video, sqlx::Error> {
        let query = format!(
            "INSERT INTO videos (title, storage_key, created_by, updated_by) \
             VALUES ($1, $2, $3, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(&input.title)
            .bind(&input.storage_key)
            .bind(input.created_by)
            .fetch_one(executor)
            .await
    }

    /// Find a video by its internal ID, archived or not.
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Video>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE id = $1");
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Active videos of a workout, in the workout's order.
    pub async fn list_for_workout<'e>(
        executor: impl PgExecutor<'e>,
        workout_id: DbId,
    ) -> Result<Vec<Video>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} \
             FROM videos v \
             JOIN workout_videos wv ON wv.video_id = v.id \
             WHERE wv.workout_id = $1 AND wv.is_active \
             ORDER BY wv.sequence"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(workout_id)
            .fetch_all(executor)
            .await
    }

    /// Key-share-lock the active videos among `ids`, returning the ids found.
    pub async fn share_active(
        conn: &mut PgConnection,
        ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM videos WHERE id = ANY($1) AND is_active ORDER BY id FOR KEY SHARE",
        )
        .bind(ids)
        .fetch_all(conn)
        .await
    }

    /// Of `ids`, the active videos no active workout link references.
    pub async fn find_orphaned<'e>(
        executor: impl PgExecutor<'e>,
        ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT v.id FROM videos v \
             WHERE v.id = ANY($1) AND v.is_active \
               AND NOT EXISTS ( \
                   SELECT 1 FROM workout_videos wv \
                   WHERE wv.video_id = v.id AND wv.is_active) \
             ORDER BY v.id",
        )
        .bind(ids)
        .fetch_all(executor)
        .await
    }

    /// Archive (deactivate) the given videos, returning the ids changed.
    pub async fn archive<'e>(
        executor: impl PgExecutor<'e>,
        ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "UPDATE videos SET is_active = false \
             WHERE id = ANY($1) AND is_active \
             RETURNING id",
        )
        .bind(ids)
        .fetch_all(executor)
        .await
    }
}
