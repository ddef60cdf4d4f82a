//! Domain logic for the ordered membership registry.
//!
//! Nothing here touches the database directly; persistence goes through the
//! [`ordering::RegistryStore`] trait.

pub mod error;
pub mod membership;
pub mod naming;
pub mod ordering;
pub mod policy;
pub mod scope;
pub mod types;
