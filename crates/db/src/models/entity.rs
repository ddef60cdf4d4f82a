//! Kind-independent view of a sequenced entity.

use fitreg_core::types::{DbId, Sequence};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The columns every sequenced entity table shares.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct EntityHeader {
    pub id: DbId,
    pub name: String,
    pub is_active: bool,
    pub sequence: Option<Sequence>,
}

/// DTO for renaming an entity.
#[derive(Debug, Clone, Deserialize)]
pub struct RenameEntity {
    pub name: String,
    pub updated_by: Option<DbId>,
}
