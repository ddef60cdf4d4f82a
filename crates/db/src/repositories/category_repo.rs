//! Repository for the `categories` table.

use fitreg_core::types::{DbId, Sequence};
use sqlx::PgExecutor;

use crate::models::category::{Category, NewCategory};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, is_active, sequence, \
    created_by, updated_by, created_at, updated_at";

/// Provides CRUD operations for categories. Positions are assigned by the
/// sequence engine; `insert` only writes the slot it is given.
pub struct CategoryRepo;

impl CategoryRepo {
    /// Insert a new active category at `sequence`, returning the created row.
    ///
    /// `input.name` is expected to be validated and trimmed already.
    pub async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        input: &NewCategory,
        sequence: Sequence,
    ) -> Result<Category, sqlx::Error> {
        let query = format!(
            "INSERT INTO categories (name, description, is_active, sequence, created_by, updated_by) \
             VALUES ($1, $2, true, $3, $4, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(sequence)
            .bind(input.created_by)
            .fetch_one(executor)
            .await
    }

    /// Find a category by its internal ID, active or not.
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM categories WHERE id = $1");
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List categories, optionally including inactive ones.
    ///
    /// Active rows come first in sequence order; inactive rows follow by name.
    pub async fn list<'e>(
        executor: impl PgExecutor<'e>,
        include_inactive: bool,
    ) -> Result<Vec<Category>, sqlx::Error> {
        let query = if include_inactive {
            format!(
                "SELECT {COLUMNS} FROM categories \
                 ORDER BY is_active DESC, sequence, name"
            )
        } else {
            format!("SELECT {COLUMNS} FROM categories WHERE is_active ORDER BY sequence")
        };
        sqlx::query_as::<_, Category>(&query)
            .fetch_all(executor)
            .await
    }
}
