//! Mutation fan-out over a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans out every [`RegistryMutation`] to any number of
//! subscribers (cache layers, search indexers). It is designed to be shared
//! via `Arc<EventBus>`.

use chrono::Utc;
use fitreg_core::scope::Scope;
use fitreg_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// RegistryMutation
// ---------------------------------------------------------------------------

/// The registry operation that produced a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Rename,
    Move,
    SoftDelete,
    Reactivate,
    SyncMembership,
    AddMember,
    RemoveMember,
    MoveMember,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Rename => "rename",
            Self::Move => "move",
            Self::SoftDelete => "soft_delete",
            Self::Reactivate => "reactivate",
            Self::SyncMembership => "sync_membership",
            Self::AddMember => "add_member",
            Self::RemoveMember => "remove_member",
            Self::MoveMember => "move_member",
        }
    }
}

/// One committed registry change.
///
/// Constructed via [`RegistryMutation::new`] and enriched with
/// [`with_scopes`](RegistryMutation::with_scopes) and
/// [`with_actor`](RegistryMutation::with_actor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryMutation {
    pub operation: Operation,

    /// Kind of the record the operation was addressed to
    /// (e.g. `"category"`, `"category_workout"`).
    pub subject_type: String,

    pub subject_id: DbId,

    /// Every scope whose ordering or membership changed.
    pub scopes: Vec<Scope>,

    /// Id of the user that triggered the change, when the caller supplied one.
    pub actor_id: Option<DbId>,

    /// When the mutation was committed (UTC).
    pub timestamp: Timestamp,
}

impl RegistryMutation {
    pub fn new(operation: Operation, subject_type: impl Into<String>, subject_id: DbId) -> Self {
        Self {
            operation,
            subject_type: subject_type.into(),
            subject_id,
            scopes: Vec::new(),
            actor_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the affected scopes, sorted and de-duplicated.
    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = Scope>) -> Self {
        self.scopes.extend(scopes);
        self.scopes.sort();
        self.scopes.dedup();
        self
    }

    pub fn with_actor(mut self, actor_id: Option<DbId>) -> Self {
        self.actor_id = actor_id;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Mutations buffered per receiver before the oldest are dropped.
const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast hub for committed registry mutations.
///
/// ```rust
/// use fitreg_events::bus::{EventBus, Operation, RegistryMutation};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(RegistryMutation::new(Operation::Create, "category", 1));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<RegistryMutation>,
}

impl EventBus {
    /// Bus buffering up to `capacity` mutations per receiver.
    ///
    /// When the buffer is full the oldest un-consumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a mutation to all current subscribers.
    ///
    /// Returns the number of subscribers reached; zero is not an error.
    pub fn publish(&self, mutation: RegistryMutation) -> usize {
        self.sender.send(mutation).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryMutation> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
