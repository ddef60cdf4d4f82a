//! Asset disposal port.
//!
//! When a cascading workout deletion leaves videos without any active link,
//! the registry hands their ids to an [`AssetDisposer`] after commit.
//! Removing objects from storage is the disposer's business.

use async_trait::async_trait;
use fitreg_core::policy::AssetPolicy;
use fitreg_core::types::DbId;

#[async_trait]
pub trait AssetDisposer: Send + Sync {
    /// `video_ids` is never empty. Errors are the implementation's to handle.
    async fn dispose(&self, policy: AssetPolicy, video_ids: &[DbId]);
}

/// Disposer that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAssetDisposer;

#[async_trait]
impl AssetDisposer for NoopAssetDisposer {
    async fn dispose(&self, policy: AssetPolicy, video_ids: &[DbId]) {
        tracing::info!(
            policy = policy.as_str(),
            count = video_ids.len(),
            "Orphaned videos left for external disposal"
        );
    }
}
