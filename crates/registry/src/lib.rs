//! Ordered membership registry.
//!
//! [`Registry`] keeps categories, workouts and their association lists
//! densely ranked (`1..=k` over the active rows of each scope) across soft
//! deletes, reactivations, moves and membership syncs. Each structural call
//! runs in one PostgreSQL transaction holding advisory locks on the scopes
//! it touches; post-commit hooks are injected as ports from
//! `fitreg_events`.

pub mod audit;
pub mod config;
pub mod entities;
pub mod error;
mod guard;
pub mod membership;
mod registry;
mod unit;

pub use audit::ScopeReport;
pub use config::RegistryConfig;
pub use entities::DeleteOutcome;
pub use error::{ErrorKind, RegistryError, RegistryResult};
pub use membership::SyncOutcome;
pub use registry::Registry;
