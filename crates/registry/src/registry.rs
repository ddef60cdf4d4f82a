use std::sync::Arc;

use fitreg_db::DbPool;
use fitreg_events::{AssetDisposer, CacheInvalidator, NoopAssetDisposer, NoopInvalidator, RegistryMutation};

use crate::config::RegistryConfig;
use crate::error::RegistryResult;
use crate::unit::UnitOfWork;

/// Entry point for every registry operation.
///
/// Cheap to clone: the pool and the injected ports are reference-counted,
/// so one `Registry` can be shared across tasks.
#[derive(Clone)]
pub struct Registry {
    pool: DbPool,
    config: Arc<RegistryConfig>,
    invalidator: Arc<dyn CacheInvalidator>,
    assets: Arc<dyn AssetDisposer>,
}

impl Registry {
    /// Build a registry with no-op ports.
    pub fn new(pool: DbPool, config: RegistryConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            invalidator: Arc::new(NoopInvalidator),
            assets: Arc::new(NoopAssetDisposer),
        }
    }

    pub fn with_invalidator(mut self, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        self.invalidator = invalidator;
        self
    }

    pub fn with_asset_disposer(mut self, assets: Arc<dyn AssetDisposer>) -> Self {
        self.assets = assets;
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub(crate) fn assets(&self) -> &dyn AssetDisposer {
        self.assets.as_ref()
    }

    pub(crate) async fn begin(&self) -> RegistryResult<UnitOfWork> {
        UnitOfWork::begin(&self.pool, &self.config).await
    }

    /// Commit `uow`, then notify the invalidator. The hook runs only once
    /// the change is durable.
    pub(crate) async fn commit(
        &self,
        uow: UnitOfWork,
        mutation: RegistryMutation,
    ) -> RegistryResult<()> {
        uow.commit(self.config.verify_invariants).await?;
        tracing::info!(
            operation = mutation.operation.as_str(),
            subject_type = %mutation.subject_type,
            subject_id = mutation.subject_id,
            scopes = mutation.scopes.len(),
            "Registry mutation committed"
        );
        self.invalidator.invalidate(&mutation).await;
        Ok(())
    }
}
