//! Scope model for the ordering registry.
//!
//! A [`Scope`] names one ordered list: either every active entity of a kind
//! (`Global`) or every active association row sharing one owner
//! (`PerOwner`). The dense-rank invariant is enforced per scope, and each
//! scope maps to exactly one advisory lock key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// Entity types that carry a global sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,
    Workout,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Category, EntityKind::Workout];

    /// Return the string representation used in logs and events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Workout => "workout",
        }
    }

    /// Human-readable entity name used in `NotFound` errors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Category => "Category",
            Self::Workout => "Workout",
        }
    }

    /// Association kinds that reference this entity, with the side it sits on.
    pub fn referencing_links(&self) -> &'static [(LinkKind, LinkSide)] {
        match self {
            Self::Category => &[(LinkKind::CategoryWorkout, LinkSide::Owner)],
            Self::Workout => &[
                (LinkKind::CategoryWorkout, LinkSide::Member),
                (LinkKind::WorkoutVideo, LinkSide::Owner),
            ],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Link kinds
// ---------------------------------------------------------------------------

/// Many-to-many association types. The owner holds the ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Workouts listed inside a category.
    CategoryWorkout,
    /// Videos listed inside a workout.
    WorkoutVideo,
}

/// Which end of an association an entity occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkSide {
    Owner,
    Member,
}

impl LinkKind {
    pub const ALL: [LinkKind; 2] = [LinkKind::CategoryWorkout, LinkKind::WorkoutVideo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CategoryWorkout => "category_workout",
            Self::WorkoutVideo => "workout_video",
        }
    }

    /// Entity kind of the list owner.
    pub fn owner_kind(&self) -> EntityKind {
        match self {
            Self::CategoryWorkout => EntityKind::Category,
            Self::WorkoutVideo => EntityKind::Workout,
        }
    }

    pub fn owner_label(&self) -> &'static str {
        self.owner_kind().label()
    }

    pub fn member_label(&self) -> &'static str {
        match self {
            Self::CategoryWorkout => "Workout",
            Self::WorkoutVideo => "Video",
        }
    }

    /// Human-readable name of the association row itself.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CategoryWorkout => "CategoryWorkout",
            Self::WorkoutVideo => "WorkoutVideo",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Mask for the owner-id bits of a lock key.
const LOCK_OWNER_MASK: i64 = (1 << 56) - 1;

/// The unit over which the 1..N ordering invariant is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// All active entities of one kind.
    Global(EntityKind),
    /// All active association rows of one kind sharing an owner.
    PerOwner(LinkKind, DbId),
}

impl Scope {
    pub fn global(kind: EntityKind) -> Self {
        Self::Global(kind)
    }

    pub fn per_owner(link: LinkKind, owner_id: DbId) -> Self {
        Self::PerOwner(link, owner_id)
    }

    /// Owner id for per-owner scopes.
    pub fn owner_id(&self) -> Option<DbId> {
        match self {
            Self::Global(_) => None,
            Self::PerOwner(_, owner) => Some(*owner),
        }
    }

    /// Human-readable name of the rows ordered by this scope.
    pub fn member_label(&self) -> &'static str {
        match self {
            Self::Global(kind) => kind.label(),
            Self::PerOwner(link, _) => link.label(),
        }
    }

    /// Advisory lock key for this scope.
    ///
    /// The high byte tags the collection and the low 56 bits carry the owner
    /// id, so keys are distinct across scopes and every global scope sorts
    /// before every per-owner scope.
    pub fn lock_key(&self) -> i64 {
        let (tag, owner): (i64, i64) = match self {
            Self::Global(EntityKind::Category) => (1, 0),
            Self::Global(EntityKind::Workout) => (2, 0),
            Self::PerOwner(LinkKind::CategoryWorkout, owner) => (3, *owner),
            Self::PerOwner(LinkKind::WorkoutVideo, owner) => (4, *owner),
        };
        (tag << 56) | (owner & LOCK_OWNER_MASK)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global(kind) => write!(f, "{kind}"),
            Self::PerOwner(link, owner) => write!(f, "{link}:{owner}"),
        }
    }
}

/// Sort and de-duplicate scopes into lock acquisition order.
pub fn lock_order(scopes: impl IntoIterator<Item = Scope>) -> Vec<Scope> {
    let mut ordered: Vec<Scope> = scopes.into_iter().collect();
    ordered.sort_by_key(Scope::lock_key);
    ordered.dedup();
    ordered
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
