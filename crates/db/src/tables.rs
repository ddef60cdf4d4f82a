//! Static mapping from kinds and scopes to tables and columns.
//!
//! Every table and column name interpolated into SQL comes from here.

use fitreg_core::scope::{EntityKind, LinkKind, LinkSide, Scope};
use fitreg_core::types::DbId;

pub(crate) fn entity_table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Category => "categories",
        EntityKind::Workout => "workouts",
    }
}

/// Table layout of one association kind.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LinkTable {
    pub table: &'static str,
    pub owner_col: &'static str,
    pub member_col: &'static str,
}

impl LinkTable {
    pub fn of(link: LinkKind) -> Self {
        match link {
            LinkKind::CategoryWorkout => Self {
                table: "category_workouts",
                owner_col: "category_id",
                member_col: "workout_id",
            },
            LinkKind::WorkoutVideo => Self {
                table: "workout_videos",
                owner_col: "workout_id",
                member_col: "video_id",
            },
        }
    }

    pub fn side_col(&self, side: LinkSide) -> &'static str {
        match side {
            LinkSide::Owner => self.owner_col,
            LinkSide::Member => self.member_col,
        }
    }

    /// Select list aliasing the kind-specific columns to the generic
    /// `owner_id` / `member_id` names of [`LinkRow`](crate::models::link::LinkRow).
    pub fn columns(&self) -> String {
        format!(
            "id, {} AS owner_id, {} AS member_id, is_active, sequence, \
             created_by, updated_by, created_at, updated_at",
            self.owner_col, self.member_col
        )
    }
}

/// Where the rows of one scope live.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScopeTarget {
    pub table: &'static str,
    owner_col: Option<&'static str>,
    owner_id: Option<DbId>,
}

impl ScopeTarget {
    pub fn of(scope: &Scope) -> Self {
        match *scope {
            Scope::Global(kind) => Self {
                table: entity_table(kind),
                owner_col: None,
                owner_id: None,
            },
            Scope::PerOwner(link, owner) => {
                let layout = LinkTable::of(link);
                Self {
                    table: layout.table,
                    owner_col: Some(layout.owner_col),
                    owner_id: Some(owner),
                }
            }
        }
    }

    /// Filter restricting a statement to this scope, using placeholder
    /// `$param`. The owner id is always bound (as `NULL` for global scopes)
    /// so every statement has the same parameter shape.
    pub fn owner_clause(&self, param: usize) -> String {
        match self.owner_col {
            Some(col) => format!("{col} = ${param}"),
            None => format!("${param}::BIGINT IS NULL"),
        }
    }

    pub fn owner_id(&self) -> Option<DbId> {
        self.owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_scope_binds_null_owner() {
        let target = ScopeTarget::of(&Scope::Global(EntityKind::Workout));
        assert_eq!(target.table, "workouts");
        assert_eq!(target.owner_clause(3), "$3::BIGINT IS NULL");
        assert_eq!(target.owner_id(), None);
    }

    #[test]
    fn per_owner_scope_filters_owner_column() {
        let target = ScopeTarget::of(&Scope::PerOwner(LinkKind::WorkoutVideo, 9));
        assert_eq!(target.table, "workout_videos");
        assert_eq!(target.owner_clause(1), "workout_id = $1");
        assert_eq!(target.owner_id(), Some(9));
    }

    #[test]
    fn link_columns_alias_to_generic_names() {
        let cols = LinkTable::of(LinkKind::CategoryWorkout).columns();
        assert!(cols.contains("category_id AS owner_id"));
        assert!(cols.contains("workout_id AS member_id"));
    }
}
