//! Deletion policies.
//!
//! Whether soft-deleting an entity with live associations is refused or
//! cascades, and what happens to video assets orphaned by a cascade, are
//! product decisions. Both are explicit configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Behaviour when soft-deleting an entity that active association rows
/// still reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Refuse with `Conflict` until the children are removed.
    #[default]
    Block,
    /// Soft-delete the referencing rows, compacting each affected list.
    Cascade,
}

impl DeletePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Cascade => "cascade",
        }
    }
}

impl FromStr for DeletePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "cascade" => Ok(Self::Cascade),
            other => Err(CoreError::InvalidArgument(format!(
                "Invalid delete policy '{other}'. Must be one of: block, cascade"
            ))),
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to videos left without any active workout link after a
/// cascading workout deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetPolicy {
    /// Mark the video inactive in the same transaction; the stored object
    /// is retained.
    #[default]
    Archive,
    /// Hand the video ids to the asset disposer after commit for removal
    /// from object storage.
    Purge,
}

impl AssetPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Purge => "purge",
        }
    }
}

impl FromStr for AssetPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "archive" => Ok(Self::Archive),
            "purge" => Ok(Self::Purge),
            other => Err(CoreError::InvalidArgument(format!(
                "Invalid asset policy '{other}'. Must be one of: archive, purge"
            ))),
        }
    }
}

impl fmt::Display for AssetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
