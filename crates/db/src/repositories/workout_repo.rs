//! Repository for the `workouts` table.

use fitreg_core::types::{DbId, Sequence};
use sqlx::PgExecutor;

use crate::models::workout::{NewWorkout, Workout};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, duration_minutes, is_active, sequence, \
    created_by, updated_by, created_at, updated_at";

/// Column list qualified with the `w` alias, for JOIN queries.
const JOINED_COLUMNS: &str = "w.id, w.name, w.description, w.duration_minutes, w.is_active, \
    w.sequence, w.created_by, w.updated_by, w.created_at, w.updated_at";

/// Provides CRUD operations for workouts.
pub struct WorkoutRepo;

impl WorkoutRepo {
    /// Insert a new active workout at `sequence`, returning the created row.
    pub async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        input: &NewWorkout,
        sequence: Sequence,
    ) -> Result<Workout, sqlx::Error> {
        let query = format!(
            "INSERT INTO workouts \
                (name, description, duration_minutes, is_active, sequence, created_by, updated_by) \
             VALUES ($1, $2, $3, true, $4, $5, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Workout>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.duration_minutes)
            .bind(sequence)
            .bind(input.created_by)
            .fetch_one(executor)
            .await
    }

    /// Find a workout by its internal ID, active or not.
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Workout>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workouts WHERE id = $1");
        sqlx::query_as::<_, Workout>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List workouts, optionally including inactive ones.
    pub async fn list<'e>(
        executor: impl PgExecutor<'e>,
        include_inactive: bool,
    ) -> Result<Vec<Workout>, sqlx::Error> {
        let query = if include_inactive {
            format!(
                "SELECT {COLUMNS} FROM workouts \
                 ORDER BY is_active DESC, sequence, name"
            )
        } else {
            format!("SELECT {COLUMNS} FROM workouts WHERE is_active ORDER BY sequence")
        };
        sqlx::query_as::<_, Workout>(&query)
            .fetch_all(executor)
            .await
    }

    /// Active workouts of a category, in the category's own order.
    pub async fn list_for_category<'e>(
        executor: impl PgExecutor<'e>,
        category_id: DbId,
    ) -> Result<Vec<Workout>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} \
             FROM workouts w \
             JOIN category_workouts cw ON cw.workout_id = w.id \
             WHERE cw.category_id = $1 AND cw.is_active AND w.is_active \
             ORDER BY cw.sequence"
        );
        sqlx::query_as::<_, Workout>(&query)
            .bind(category_id)
            .fetch_all(executor)
            .await
    }
}
