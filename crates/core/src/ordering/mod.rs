//! Sequence engine: dense 1..N positions per [`Scope`](crate::scope::Scope).
//!
//! - [`store`]: the [`RegistryStore`] seam the engine runs on.
//! - [`engine`]: `append`, `insert_at`, `move_to`, `soft_delete_compact`,
//!   `reactivate`, plus the dense-rank check.
//! - [`slots`]: position clamping and batched append slots.
//! - [`memory`]: an in-process store.

pub mod engine;
pub mod memory;
pub mod slots;
pub mod store;

pub use engine::MoveOutcome;
pub use memory::MemoryStore;
pub use slots::NextSlots;
pub use store::{RegistryStore, ScopeStats, SlotState};
