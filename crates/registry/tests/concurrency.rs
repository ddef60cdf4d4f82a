//! Concurrent writers against shared scopes.
//!
//! Each test spawns many registry calls at once and then audits every scope.
//! Calls may legitimately fail with `NotFound` (their target was deleted by
//! a concurrent call) or a retryable error; they must never leave a scope
//! with gaps or duplicates.

mod common;

use common::*;
use fitreg_core::policy::AssetPolicy;
use fitreg_core::scope::{EntityKind, LinkKind, Scope};
use fitreg_db::models::category::NewCategory;
use fitreg_registry::{ErrorKind, Registry, RegistryConfig, RegistryResult};
use futures::future::join_all;
use sqlx::PgPool;

/// Results of spawned tasks, panicking on a task panic.
async fn join<T: Send + 'static>(handles: Vec<tokio::task::JoinHandle<T>>) -> Vec<T> {
    join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect()
}

fn tolerated<T>(result: &RegistryResult<T>) -> bool {
    match result {
        Ok(_) => true,
        Err(err) => matches!(err.kind(), ErrorKind::NotFound) || err.is_retryable(),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_appends_get_distinct_slots(pool: PgPool) {
    let registry = build_registry(pool);

    let handles = (0..16)
        .map(|i| {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .create_category(&NewCategory {
                        name: format!("Category {i}"),
                        ..Default::default()
                    })
                    .await
            })
        })
        .collect();

    for result in join(handles).await {
        result.unwrap();
    }

    let seqs: Vec<i32> = ranked(&registry, EntityKind::Category)
        .await
        .into_iter()
        .map(|(_, s)| s)
        .collect();
    assert_eq!(seqs, (1..=16).collect::<Vec<_>>());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn mixed_moves_and_deletes_keep_scope_dense(pool: PgPool) {
    let registry = build_registry(pool);
    let mut ids = Vec::new();
    for i in 0..12 {
        ids.push(create_workout(&registry, &format!("Workout {i}")).await);
    }

    let handles = (0..36)
        .map(|i| {
            let registry = registry.clone();
            let id = ids[i % ids.len()];
            tokio::spawn(async move {
                match i % 3 {
                    0 => registry
                        .move_entity(EntityKind::Workout, id, (i % 7) as i32 + 1)
                        .await
                        .map(|_| ()),
                    1 if i % 4 == 1 => registry
                        .soft_delete_entity(EntityKind::Workout, id)
                        .await
                        .map(|_| ()),
                    _ => registry
                        .move_entity(EntityKind::Workout, id, 12 - (i % 5) as i32)
                        .await
                        .map(|_| ()),
                }
            })
        })
        .collect();

    for result in join(handles).await {
        assert!(tolerated(&result), "unexpected error: {result:?}");
    }
    assert_all_dense(&registry).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn overlapping_syncs_keep_every_list_dense(pool: PgPool) {
    let registry = build_registry(pool);
    let mut categories = Vec::new();
    for i in 0..4 {
        categories.push(create_category(&registry, &format!("C{i}")).await);
    }
    let mut workouts = Vec::new();
    for i in 0..8 {
        workouts.push(create_workout(&registry, &format!("W{i}")).await);
    }

    let handles = (0..24)
        .map(|i| {
            let registry = registry.clone();
            let categories = categories.clone();
            let workouts = workouts.clone();
            tokio::spawn(async move {
                if i % 2 == 0 {
                    // Each workout alternates between two overlapping owner sets.
                    let w = workouts[i % workouts.len()];
                    let owners: Vec<i64> = categories
                        .iter()
                        .copied()
                        .skip(i % 3)
                        .take(2)
                        .collect();
                    registry
                        .sync_owners(LinkKind::CategoryWorkout, w, &owners, None)
                        .await
                        .map(|_| ())
                } else {
                    let c = categories[i % categories.len()];
                    let members: Vec<i64> = workouts
                        .iter()
                        .copied()
                        .filter(|w| (w + i as i64) % 3 != 0)
                        .collect();
                    registry
                        .sync_members(LinkKind::CategoryWorkout, c, &members, None)
                        .await
                        .map(|_| ())
                }
            })
        })
        .collect();

    for result in join(handles).await {
        assert!(tolerated(&result), "unexpected error: {result:?}");
    }
    assert_all_dense(&registry).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deletes_racing_link_writes_leave_no_dangling_links(pool: PgPool) {
    let registry = Registry::new(pool, cascade_config(AssetPolicy::Archive));
    let category = create_category(&registry, "Shared").await;
    let mut workouts = Vec::new();
    for i in 0..6 {
        workouts.push(create_workout(&registry, &format!("W{i}")).await);
    }

    let handles = workouts
        .iter()
        .copied()
        .enumerate()
        .flat_map(|(i, w)| {
            let adder = registry.clone();
            let deleter = registry.clone();
            [
                tokio::spawn(async move {
                    adder
                        .add_member(LinkKind::CategoryWorkout, category, w, Some(1), None)
                        .await
                        .map(|_| ())
                }),
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        deleter
                            .soft_delete_entity(EntityKind::Workout, w)
                            .await
                            .map(|_| ())
                    } else {
                        Ok(())
                    }
                }),
            ]
        })
        .collect();

    for result in join(handles).await {
        assert!(tolerated(&result), "unexpected error: {result:?}");
    }

    // Every active link points at an active workout.
    let active: Vec<i64> = registry
        .list_entities(EntityKind::Workout)
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.id)
        .collect();
    for (member, _) in members(&registry, LinkKind::CategoryWorkout, category).await {
        assert!(active.contains(&member), "link to inactive workout {member}");
    }
    assert_all_dense(&registry).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn lock_timeout_is_retryable_and_applies_nothing(pool: PgPool) {
    let config = RegistryConfig {
        lock_timeout_ms: 100,
        ..test_config()
    };
    let registry = Registry::new(pool.clone(), config);
    let a = create_category(&registry, "A").await;
    create_category(&registry, "B").await;
    create_category(&registry, "C").await;
    let before = ranked(&registry, EntityKind::Category).await;

    // Another session holds the categories scope.
    let mut holder = pool.begin().await.unwrap();
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(Scope::Global(EntityKind::Category).lock_key())
        .execute(&mut *holder)
        .await
        .unwrap();

    let err = registry
        .move_entity(EntityKind::Category, a, 3)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.is_retryable());

    let err = registry
        .create_category(&NewCategory {
            name: "D".to_string(),
            position: Some(1),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    assert_eq!(ranked(&registry, EntityKind::Category).await, before);

    holder.rollback().await.unwrap();
    registry.move_entity(EntityKind::Category, a, 3).await.unwrap();
    assert_eq!(names(&registry, EntityKind::Category).await, ["B", "C", "A"]);
}
