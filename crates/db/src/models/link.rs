//! Association row model shared by every link table.

use fitreg_core::types::{DbId, Sequence, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `category_workouts` or `workout_videos`, with the
/// kind-specific columns aliased to `owner_id` / `member_id`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LinkRow {
    pub id: DbId,
    pub owner_id: DbId,
    pub member_id: DbId,
    pub is_active: bool,
    pub sequence: Option<Sequence>,
    pub created_by: Option<DbId>,
    pub updated_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
