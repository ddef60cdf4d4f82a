//! Post-commit ports for the ordered membership registry.
//!
//! - [`RegistryMutation`]: the envelope describing one committed change.
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`CacheInvalidator`]: hook invoked once per committed mutation.
//! - [`AssetDisposer`]: hook receiving videos orphaned by a deletion.

pub mod assets;
pub mod bus;
pub mod invalidation;

pub use assets::{AssetDisposer, NoopAssetDisposer};
pub use bus::{EventBus, Operation, RegistryMutation};
pub use invalidation::{BusInvalidator, CacheInvalidator, NoopInvalidator};
