//! PostgreSQL persistence for the ordered membership registry.
//!
//! - [`models`]: row structs and create DTOs.
//! - [`repositories`]: zero-sized repositories with async query methods.
//! - [`store`]: the [`RegistryStore`](fitreg_core::ordering::RegistryStore)
//!   adapter used by the sequence engine.
//! - [`locks`]: per-scope advisory locks.
//! - [`errors`]: sqlx error classification.

use sqlx::postgres::PgPoolOptions;

pub mod errors;
pub mod locks;
pub mod models;
pub mod repositories;
pub mod store;
mod tables;

pub use store::PgRegistryStore;

pub type DbPool = sqlx::PgPool;

/// Default pool size when none is configured.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
