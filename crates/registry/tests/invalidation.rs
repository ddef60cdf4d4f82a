//! Post-commit hooks and the ordering audit.

mod common;

use std::sync::Arc;

use common::*;
use fitreg_core::scope::{EntityKind, LinkKind, Scope};
use fitreg_db::models::category::NewCategory;
use fitreg_events::{BusInvalidator, EventBus, Operation};
use fitreg_registry::{ErrorKind, Registry};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// CacheInvalidator
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalidator_fires_once_per_committed_mutation(pool: PgPool) {
    let (registry, invalidator) = recording_registry(pool, test_config());

    let a = create_category(&registry, "A").await;
    let b = create_category(&registry, "B").await;
    assert_eq!(invalidator.count(), 2);

    registry.move_entity(EntityKind::Category, a, 2).await.unwrap();
    assert_eq!(invalidator.count(), 3);
    let last = invalidator.last().unwrap();
    assert_eq!(last.operation, Operation::Move);
    assert_eq!(last.subject_type, "category");
    assert_eq!(last.subject_id, a);
    assert_eq!(last.scopes, [Scope::Global(EntityKind::Category)]);

    registry.soft_delete_entity(EntityKind::Category, b).await.unwrap();
    registry.reactivate_entity(EntityKind::Category, b).await.unwrap();

    assert_eq!(
        invalidator.operations(),
        [
            Operation::Create,
            Operation::Create,
            Operation::Move,
            Operation::SoftDelete,
            Operation::Reactivate,
        ]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn noops_and_failures_do_not_notify(pool: PgPool) {
    let (registry, invalidator) = recording_registry(pool, test_config());
    let category = create_category(&registry, "A").await;
    let workout = create_workout(&registry, "W").await;
    registry
        .sync_members(LinkKind::CategoryWorkout, category, &[workout], None)
        .await
        .unwrap();
    let baseline = invalidator.count();

    // No-op move and sync.
    registry.move_entity(EntityKind::Category, category, 1).await.unwrap();
    registry
        .sync_owners(LinkKind::CategoryWorkout, workout, &[category], None)
        .await
        .unwrap();

    // Rejected calls.
    let err = registry
        .create_category(&NewCategory {
            name: "a".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = registry
        .soft_delete_entity(EntityKind::Workout, workout)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(invalidator.count(), baseline);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sync_mutation_lists_changed_scopes(pool: PgPool) {
    let (registry, invalidator) = recording_registry(pool, test_config());
    let x = create_category(&registry, "X").await;
    let y = create_category(&registry, "Y").await;
    let w = create_workout(&registry, "W").await;
    registry
        .sync_owners(LinkKind::CategoryWorkout, w, &[x], Some(2))
        .await
        .unwrap();

    registry
        .sync_owners(LinkKind::CategoryWorkout, w, &[y], Some(2))
        .await
        .unwrap();

    let last = invalidator.last().unwrap();
    assert_eq!(last.operation, Operation::SyncMembership);
    assert_eq!(last.subject_type, "workout");
    assert_eq!(last.subject_id, w);
    assert_eq!(last.actor_id, Some(2));
    assert_eq!(
        last.scopes,
        [
            Scope::PerOwner(LinkKind::CategoryWorkout, x),
            Scope::PerOwner(LinkKind::CategoryWorkout, y),
        ]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bus_invalidator_publishes_committed_mutations(pool: PgPool) {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let registry = Registry::new(pool, test_config())
        .with_invalidator(Arc::new(BusInvalidator::new(Arc::clone(&bus))));

    let id = create_workout(&registry, "Intervals").await;

    let received = rx.recv().await.unwrap();
    assert_eq!(received.operation, Operation::Create);
    assert_eq!(received.subject_type, "workout");
    assert_eq!(received.subject_id, id);
}

// ---------------------------------------------------------------------------
// Ordering audit
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn audit_reports_every_scope(pool: PgPool) {
    let registry = build_registry(pool);
    let category = create_category(&registry, "A").await;
    let workout = create_workout(&registry, "W").await;
    let video = create_video(&registry, "V").await;
    registry
        .add_member(LinkKind::CategoryWorkout, category, workout, None, None)
        .await
        .unwrap();
    registry
        .add_member(LinkKind::WorkoutVideo, workout, video, None, None)
        .await
        .unwrap();

    let reports = registry.verify_all().await.unwrap();
    let scopes: Vec<Scope> = reports.iter().map(|r| r.scope).collect();
    assert_eq!(
        scopes,
        [
            Scope::Global(EntityKind::Category),
            Scope::Global(EntityKind::Workout),
            Scope::PerOwner(LinkKind::CategoryWorkout, category),
            Scope::PerOwner(LinkKind::WorkoutVideo, workout),
        ]
    );
    assert!(reports.iter().all(|r| r.is_ok()));
    assert!(reports.iter().all(|r| r.stats.active == 1));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn audit_detects_out_of_band_gap(pool: PgPool) {
    let registry = build_registry(pool.clone());
    create_category(&registry, "A").await;
    let b = create_category(&registry, "B").await;

    sqlx::query("UPDATE categories SET sequence = 5 WHERE id = $1")
        .bind(b)
        .execute(&pool)
        .await
        .unwrap();

    let reports = registry.verify_all().await.unwrap();
    let failing: Vec<_> = reports.iter().filter(|r| !r.is_ok()).collect();
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0].scope, Scope::Global(EntityKind::Category));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pre_commit_check_rolls_back_on_corrupt_scope(pool: PgPool) {
    let (registry, invalidator) = recording_registry(pool.clone(), test_config());
    create_category(&registry, "A").await;
    let b = create_category(&registry, "B").await;
    sqlx::query("UPDATE categories SET sequence = 5 WHERE id = $1")
        .bind(b)
        .execute(&pool)
        .await
        .unwrap();
    let baseline = invalidator.count();

    let err = registry
        .create_category(&NewCategory {
            name: "C".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(!err.is_retryable());

    assert_eq!(registry.list_categories(true).await.unwrap().len(), 2);
    assert_eq!(invalidator.count(), baseline);
}
