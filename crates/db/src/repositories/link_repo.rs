//! Repository for the association tables (`category_workouts`,
//! `workout_videos`), parameterized by [`LinkKind`].

use fitreg_core::scope::{LinkKind, LinkSide};
use fitreg_core::types::{DbId, Sequence};
use sqlx::PgExecutor;

use crate::models::link::LinkRow;
use crate::tables::LinkTable;

/// Provides queries over association rows of any [`LinkKind`].
pub struct LinkRepo;

impl LinkRepo {
    /// Active rows of one owner in sequence order.
    pub async fn list_active<'e>(
        executor: impl PgExecutor<'e>,
        link: LinkKind,
        owner_id: DbId,
    ) -> Result<Vec<LinkRow>, sqlx::Error> {
        let t = LinkTable::of(link);
        let query = format!(
            "SELECT {} FROM {} WHERE {} = $1 AND is_active ORDER BY sequence",
            t.columns(),
            t.table,
            t.owner_col
        );
        sqlx::query_as::<_, LinkRow>(&query)
            .bind(owner_id)
            .fetch_all(executor)
            .await
    }

    /// Active rows referencing `id` on the given side, ordered by id.
    pub async fn list_active_by_side<'e>(
        executor: impl PgExecutor<'e>,
        link: LinkKind,
        side: LinkSide,
        id: DbId,
    ) -> Result<Vec<LinkRow>, sqlx::Error> {
        let t = LinkTable::of(link);
        let query = format!(
            "SELECT {} FROM {} WHERE {} = $1 AND is_active ORDER BY id",
            t.columns(),
            t.table,
            t.side_col(side)
        );
        sqlx::query_as::<_, LinkRow>(&query)
            .bind(id)
            .fetch_all(executor)
            .await
    }

    /// Find the row for one `(owner, member)` pair, active or not.
    pub async fn find_pair<'e>(
        executor: impl PgExecutor<'e>,
        link: LinkKind,
        owner_id: DbId,
        member_id: DbId,
    ) -> Result<Option<LinkRow>, sqlx::Error> {
        let t = LinkTable::of(link);
        let query = format!(
            "SELECT {} FROM {} WHERE {} = $1 AND {} = $2",
            t.columns(),
            t.table,
            t.owner_col,
            t.member_col
        );
        sqlx::query_as::<_, LinkRow>(&query)
            .bind(owner_id)
            .bind(member_id)
            .fetch_optional(executor)
            .await
    }

    /// Find the rows, active or not, for a batch of `(owner, member)` pairs.
    pub async fn find_pairs<'e>(
        executor: impl PgExecutor<'e>,
        link: LinkKind,
        pairs: &[(DbId, DbId)],
    ) -> Result<Vec<LinkRow>, sqlx::Error> {
        let t = LinkTable::of(link);
        let (owners, members): (Vec<DbId>, Vec<DbId>) = pairs.iter().copied().unzip();
        let query = format!(
            "SELECT {} FROM {} \
             WHERE ({}, {}) IN (SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[]))",
            t.columns(),
            t.table,
            t.owner_col,
            t.member_col
        );
        sqlx::query_as::<_, LinkRow>(&query)
            .bind(&owners)
            .bind(&members)
            .fetch_all(executor)
            .await
    }

    /// Highest active sequence per owner, for every owner in `owner_ids` that
    /// has at least one active row. One query regardless of batch size.
    pub async fn max_active_by_owner<'e>(
        executor: impl PgExecutor<'e>,
        link: LinkKind,
        owner_ids: &[DbId],
    ) -> Result<Vec<(DbId, Sequence)>, sqlx::Error> {
        let t = LinkTable::of(link);
        let query = format!(
            "SELECT {owner}, COALESCE(MAX(sequence), 0) FROM {table} \
             WHERE is_active AND {owner} = ANY($1) \
             GROUP BY {owner}",
            owner = t.owner_col,
            table = t.table
        );
        sqlx::query_as::<_, (DbId, Sequence)>(&query)
            .bind(owner_ids)
            .fetch_all(executor)
            .await
    }

    /// Every owner id that has at least one row, active or not.
    pub async fn distinct_owners<'e>(
        executor: impl PgExecutor<'e>,
        link: LinkKind,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let t = LinkTable::of(link);
        let query = format!(
            "SELECT DISTINCT {owner} FROM {table} ORDER BY {owner}",
            owner = t.owner_col,
            table = t.table
        );
        sqlx::query_scalar::<_, DbId>(&query)
            .fetch_all(executor)
            .await
    }

    /// Insert a new active association row at `sequence`.
    pub async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        link: LinkKind,
        owner_id: DbId,
        member_id: DbId,
        sequence: Sequence,
        created_by: Option<DbId>,
    ) -> Result<LinkRow, sqlx::Error> {
        let t = LinkTable::of(link);
        let query = format!(
            "INSERT INTO {} ({}, {}, is_active, sequence, created_by, updated_by) \
             VALUES ($1, $2, true, $3, $4, $4) \
             RETURNING {}",
            t.table,
            t.owner_col,
            t.member_col,
            t.columns()
        );
        sqlx::query_as::<_, LinkRow>(&query)
            .bind(owner_id)
            .bind(member_id)
            .bind(sequence)
            .bind(created_by)
            .fetch_one(executor)
            .await
    }

    /// Record who last touched a set of rows.
    pub async fn touch<'e>(
        executor: impl PgExecutor<'e>,
        link: LinkKind,
        ids: &[DbId],
        updated_by: DbId,
    ) -> Result<u64, sqlx::Error> {
        let t = LinkTable::of(link);
        let query = format!("UPDATE {} SET updated_by = $2 WHERE id = ANY($1)", t.table);
        let result = sqlx::query(&query)
            .bind(ids)
            .bind(updated_by)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
