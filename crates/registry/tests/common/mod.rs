#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fitreg_core::policy::{AssetPolicy, DeletePolicy};
use fitreg_core::scope::{EntityKind, LinkKind};
use fitreg_core::types::{DbId, Sequence};
use fitreg_db::models::category::NewCategory;
use fitreg_db::models::video::NewVideo;
use fitreg_db::models::workout::NewWorkout;
use fitreg_events::{AssetDisposer, CacheInvalidator, Operation, RegistryMutation};
use fitreg_registry::{Registry, RegistryConfig};
use sqlx::PgPool;

/// Build a test `RegistryConfig` with defaults and short timeouts.
pub fn test_config() -> RegistryConfig {
    RegistryConfig {
        lock_timeout_ms: 10_000,
        statement_timeout_ms: 30_000,
        ..RegistryConfig::default()
    }
}

/// Config that cascades deletions with the given asset policy.
pub fn cascade_config(assets: AssetPolicy) -> RegistryConfig {
    RegistryConfig {
        on_delete: DeletePolicy::Cascade,
        on_asset_delete: assets,
        ..test_config()
    }
}

pub fn build_registry(pool: PgPool) -> Registry {
    Registry::new(pool, test_config())
}

pub async fn create_category(registry: &Registry, name: &str) -> DbId {
    registry
        .create_category(&NewCategory {
            name: name.to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

pub async fn create_workout(registry: &Registry, name: &str) -> DbId {
    registry
        .create_workout(&NewWorkout {
            name: name.to_string(),
            duration_minutes: Some(20),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

pub async fn create_video(registry: &Registry, title: &str) -> DbId {
    registry
        .create_video(&NewVideo {
            title: title.to_string(),
            storage_key: format!("videos/{}.mp4", title.to_lowercase()),
            created_by: None,
        })
        .await
        .unwrap()
        .id
}

/// Active entity names of `kind`, in order.
pub async fn names(registry: &Registry, kind: EntityKind) -> Vec<String> {
    registry
        .list_entities(kind)
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.name)
        .collect()
}

/// `(name, sequence)` of the active entities of `kind`, in order.
pub async fn ranked(registry: &Registry, kind: EntityKind) -> Vec<(String, Sequence)> {
    registry
        .list_entities(kind)
        .await
        .unwrap()
        .into_iter()
        .map(|h| (h.name, h.sequence.unwrap()))
        .collect()
}

/// `(member_id, sequence)` of `owner_id`'s active list, in order.
pub async fn members(registry: &Registry, link: LinkKind, owner_id: DbId) -> Vec<(DbId, Sequence)> {
    registry
        .list_members(link, owner_id)
        .await
        .unwrap()
        .into_iter()
        .map(|row| (row.member_id, row.sequence.unwrap()))
        .collect()
}

/// Assert that every scope in the database passes the ordering audit.
pub async fn assert_all_dense(registry: &Registry) {
    let reports = registry.verify_all().await.unwrap();
    let failing: Vec<_> = reports.iter().filter(|r| !r.is_ok()).collect();
    assert!(failing.is_empty(), "scopes failing audit: {failing:?}");
}

// ---------------------------------------------------------------------------
// Recording ports
// ---------------------------------------------------------------------------

/// Invalidator that records every mutation it receives.
#[derive(Default)]
pub struct RecordingInvalidator {
    seen: Mutex<Vec<RegistryMutation>>,
}

impl RecordingInvalidator {
    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.seen.lock().unwrap().iter().map(|m| m.operation).collect()
    }

    pub fn last(&self) -> Option<RegistryMutation> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CacheInvalidator for RecordingInvalidator {
    async fn invalidate(&self, mutation: &RegistryMutation) {
        self.seen.lock().unwrap().push(mutation.clone());
    }
}

/// Asset disposer that records every call.
#[derive(Default)]
pub struct RecordingDisposer {
    calls: Mutex<Vec<(AssetPolicy, Vec<DbId>)>>,
}

impl RecordingDisposer {
    pub fn calls(&self) -> Vec<(AssetPolicy, Vec<DbId>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetDisposer for RecordingDisposer {
    async fn dispose(&self, policy: AssetPolicy, video_ids: &[DbId]) {
        self.calls.lock().unwrap().push((policy, video_ids.to_vec()));
    }
}

/// Registry wired to a fresh recording invalidator.
pub fn recording_registry(pool: PgPool, config: RegistryConfig) -> (Registry, Arc<RecordingInvalidator>) {
    let invalidator = Arc::new(RecordingInvalidator::default());
    let registry = Registry::new(pool, config).with_invalidator(invalidator.clone());
    (registry, invalidator)
}
