//! Workout entity model and DTOs.

use fitreg_core::types::{DbId, Sequence, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `workouts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Workout {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub is_active: bool,
    pub sequence: Option<Sequence>,
    pub created_by: Option<DbId>,
    pub updated_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new workout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewWorkout {
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    /// Target position; appended at the end when `None`.
    pub position: Option<Sequence>,
    pub created_by: Option<DbId>,
}
