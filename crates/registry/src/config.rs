use std::str::FromStr;

use fitreg_core::error::CoreError;
use fitreg_core::policy::{AssetPolicy, DeletePolicy};
use fitreg_db::DEFAULT_MAX_CONNECTIONS;

/// Registry configuration loaded from environment variables.
///
/// All fields except `database_url` have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// PostgreSQL connection URL. Required by the binary, unused by
    /// [`Registry`](crate::Registry) itself, which receives a ready pool.
    pub database_url: Option<String>,
    /// Pool size (default: `20`).
    pub max_connections: u32,
    /// Soft-deleting an entity that active links reference (default: `block`).
    pub on_delete: DeletePolicy,
    /// Orphaned videos after a cascading workout deletion (default: `archive`).
    pub on_asset_delete: AssetPolicy,
    /// `lock_timeout` applied to every structural transaction, in ms.
    pub lock_timeout_ms: u64,
    /// `statement_timeout` applied to every structural transaction, in ms.
    pub statement_timeout_ms: u64,
    /// Re-check dense ranking of every touched scope before commit.
    pub verify_invariants: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            on_delete: DeletePolicy::default(),
            on_asset_delete: AssetPolicy::default(),
            lock_timeout_ms: 5_000,
            statement_timeout_ms: 15_000,
            verify_invariants: true,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default   |
    /// |---------------------------------|-----------|
    /// | `DATABASE_URL`                  | (none)    |
    /// | `DB_MAX_CONNECTIONS`            | `20`      |
    /// | `REGISTRY_ON_DELETE`            | `block`   |
    /// | `REGISTRY_ON_ASSET_DELETE`      | `archive` |
    /// | `REGISTRY_LOCK_TIMEOUT_MS`      | `5000`    |
    /// | `REGISTRY_STATEMENT_TIMEOUT_MS` | `15000`   |
    /// | `REGISTRY_VERIFY_INVARIANTS`    | `true`    |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let defaults = Self::default();

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.max_connections)?,
            on_delete: parse_or(&lookup, "REGISTRY_ON_DELETE", defaults.on_delete)?,
            on_asset_delete: parse_or(&lookup, "REGISTRY_ON_ASSET_DELETE", defaults.on_asset_delete)?,
            lock_timeout_ms: parse_or(&lookup, "REGISTRY_LOCK_TIMEOUT_MS", defaults.lock_timeout_ms)?,
            statement_timeout_ms: parse_or(
                &lookup,
                "REGISTRY_STATEMENT_TIMEOUT_MS",
                defaults.statement_timeout_ms,
            )?,
            verify_invariants: parse_or(
                &lookup,
                "REGISTRY_VERIFY_INVARIANTS",
                defaults.verify_invariants,
            )?,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            CoreError::InvalidArgument(format!("{key} has invalid value '{raw}': {e}"))
        }),
    }
}
