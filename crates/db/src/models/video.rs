//! Video asset reference model and DTOs.
//!
//! A video row points at an object in external storage. It has no global
//! position; ordering happens per workout in `workout_videos`.

use fitreg_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `videos` table. `is_active = false` means archived.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Video {
    pub id: DbId,
    pub title: String,
    pub storage_key: String,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub updated_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering an already-uploaded video.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVideo {
    pub title: String,
    pub storage_key: String,
    pub created_by: Option<DbId>,
}
