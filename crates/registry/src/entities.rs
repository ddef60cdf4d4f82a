//! Globally ordered entities: categories and workouts.
//!
//! Every mutation locks the kind's global scope first, so the duplicate-name
//! guard and the sequence engine see a stable list.

use fitreg_core::error::CoreError;
use fitreg_core::naming::{validate_id, validate_name};
use fitreg_core::ordering::{engine, MoveOutcome};
use fitreg_core::policy::{AssetPolicy, DeletePolicy};
use fitreg_core::scope::{EntityKind, LinkKind, Scope};
use fitreg_core::types::{DbId, Sequence};
use fitreg_db::models::category::{Category, NewCategory};
use fitreg_db::models::entity::{EntityHeader, RenameEntity};
use fitreg_db::models::link::LinkRow;
use fitreg_db::models::video::{NewVideo, Video};
use fitreg_db::models::workout::{NewWorkout, Workout};
use fitreg_db::repositories::{CategoryRepo, EntityRepo, LinkRepo, VideoRepo, WorkoutRepo};
use fitreg_events::{Operation, RegistryMutation};
use serde::Serialize;
use sqlx::PgConnection;

use crate::error::RegistryResult;
use crate::guard;
use crate::registry::Registry;

/// Result of [`Registry::soft_delete_entity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub id: DbId,
    /// Position the entity held before deletion.
    pub old_sequence: Sequence,
    /// Association rows soft-deleted by a cascade.
    pub detached_links: usize,
    /// Videos set inactive because the cascade left them unlinked.
    pub archived_videos: Vec<DbId>,
    /// Unlinked videos handed to the asset disposer for purging.
    pub purged_videos: Vec<DbId>,
}

impl Registry {
    pub async fn create_category(&self, input: &NewCategory) -> RegistryResult<Category> {
        let name = validate_name(&input.name)?;
        let kind = EntityKind::Category;
        let scope = Scope::Global(kind);

        let mut uow = self.begin().await?;
        uow.lock([scope]).await?;
        guard::ensure_name_available(uow.conn(), kind, &name, None).await?;

        let seq = uow.claim_slot(&scope, input.position).await?;
        let input = NewCategory {
            name,
            ..input.clone()
        };
        let category = CategoryRepo::insert(uow.conn(), &input, seq).await?;

        let mutation = RegistryMutation::new(Operation::Create, kind.as_str(), category.id)
            .with_scopes([scope])
            .with_actor(input.created_by);
        self.commit(uow, mutation).await?;
        Ok(category)
    }

    pub async fn create_workout(&self, input: &NewWorkout) -> RegistryResult<Workout> {
        let name = validate_name(&input.name)?;
        if let Some(minutes) = input.duration_minutes {
            if minutes <= 0 {
                return Err(CoreError::InvalidArgument(format!(
                    "duration_minutes must be positive, got {minutes}"
                ))
                .into());
            }
        }
        let kind = EntityKind::Workout;
        let scope = Scope::Global(kind);

        let mut uow = self.begin().await?;
        uow.lock([scope]).await?;
        guard::ensure_name_available(uow.conn(), kind, &name, None).await?;

        let seq = uow.claim_slot(&scope, input.position).await?;
        let input = NewWorkout {
            name,
            ..input.clone()
        };
        let workout = WorkoutRepo::insert(uow.conn(), &input, seq).await?;

        let mutation = RegistryMutation::new(Operation::Create, kind.as_str(), workout.id)
            .with_scopes([scope])
            .with_actor(input.created_by);
        self.commit(uow, mutation).await?;
        Ok(workout)
    }

    /// Rename an active entity. A change of case or surrounding whitespace
    /// of its own name is allowed.
    pub async fn rename_entity(
        &self,
        kind: EntityKind,
        id: DbId,
        input: &RenameEntity,
    ) -> RegistryResult<EntityHeader> {
        validate_id(kind.label(), id)?;
        let name = validate_name(&input.name)?;
        let scope = Scope::Global(kind);

        let mut uow = self.begin().await?;
        uow.lock([scope]).await?;
        guard::require_active_entity(uow.conn(), kind, id).await?;
        guard::ensure_name_available(uow.conn(), kind, &name, Some(id)).await?;

        let header = EntityRepo::rename(uow.conn(), kind, id, &name, input.updated_by)
            .await?
            .ok_or_else(|| guard::not_found(kind.label(), id))?;

        let mutation = RegistryMutation::new(Operation::Rename, kind.as_str(), id)
            .with_scopes([scope])
            .with_actor(input.updated_by);
        self.commit(uow, mutation).await?;
        Ok(header)
    }

    /// Move an active entity to `target`, clamped to the list bounds.
    pub async fn move_entity(
        &self,
        kind: EntityKind,
        id: DbId,
        target: Sequence,
    ) -> RegistryResult<MoveOutcome> {
        validate_id(kind.label(), id)?;
        let scope = Scope::Global(kind);

        let mut uow = self.begin().await?;
        uow.lock([scope]).await?;
        let outcome = engine::move_to(&mut uow.store(), &scope, id, target).await?;
        if outcome.is_noop() {
            uow.rollback().await?;
            return Ok(outcome);
        }

        let mutation =
            RegistryMutation::new(Operation::Move, kind.as_str(), id).with_scopes([scope]);
        self.commit(uow, mutation).await?;
        Ok(outcome)
    }

    /// Soft-delete an entity and close the gap it leaves.
    ///
    /// With [`DeletePolicy::Block`] an entity that active links still
    /// reference is refused. With [`DeletePolicy::Cascade`] those links are
    /// soft-deleted too and every list they sat in is compacted; videos left
    /// without any active link are then handled per [`AssetPolicy`].
    pub async fn soft_delete_entity(
        &self,
        kind: EntityKind,
        id: DbId,
    ) -> RegistryResult<DeleteOutcome> {
        validate_id(kind.label(), id)?;
        let global = Scope::Global(kind);

        let mut uow = self.begin().await?;
        let seen = referencing_rows(uow.conn(), kind, id).await?;
        uow.lock(std::iter::once(global).chain(link_scopes(&seen)))
            .await?;

        match EntityRepo::lock_for_update(uow.conn(), kind, id).await? {
            Some(header) if header.is_active => {}
            _ => return Err(guard::not_found(kind.label(), id)),
        }

        // Links committed between the first read and the row lock may sit
        // in scopes not yet held.
        let mut referencing = referencing_rows(uow.conn(), kind, id).await?;
        uow.lock(link_scopes(&referencing)).await?;

        if self.config().on_delete == DeletePolicy::Block {
            guard::ensure_unreferenced(kind, id, &referencing)?;
        }

        referencing.sort_by(|(la, a), (lb, b)| {
            let sa = Scope::PerOwner(*la, a.owner_id);
            let sb = Scope::PerOwner(*lb, b.owner_id);
            sa.cmp(&sb).then(b.sequence.cmp(&a.sequence))
        });
        for (link, row) in &referencing {
            let scope = Scope::PerOwner(*link, row.owner_id);
            engine::soft_delete_compact(&mut uow.store(), &scope, row.id).await?;
        }

        let old_sequence = engine::soft_delete_compact(&mut uow.store(), &global, id).await?;

        let linked_videos: Vec<DbId> = referencing
            .iter()
            .filter(|(link, _)| *link == LinkKind::WorkoutVideo)
            .map(|(_, row)| row.member_id)
            .collect();
        let orphaned = if linked_videos.is_empty() {
            Vec::new()
        } else {
            VideoRepo::find_orphaned(uow.conn(), &linked_videos).await?
        };
        let asset_policy = self.config().on_asset_delete;
        let (archived_videos, purged_videos) = match asset_policy {
            AssetPolicy::Archive if !orphaned.is_empty() => {
                (VideoRepo::archive(uow.conn(), &orphaned).await?, Vec::new())
            }
            AssetPolicy::Archive => (Vec::new(), Vec::new()),
            AssetPolicy::Purge => (Vec::new(), orphaned),
        };

        let mutation = RegistryMutation::new(Operation::SoftDelete, kind.as_str(), id)
            .with_scopes(std::iter::once(global).chain(link_scopes(&referencing)));
        self.commit(uow, mutation).await?;

        for (policy, ids) in [
            (AssetPolicy::Archive, &archived_videos),
            (AssetPolicy::Purge, &purged_videos),
        ] {
            if !ids.is_empty() {
                self.assets().dispose(policy, ids).await;
            }
        }

        Ok(DeleteOutcome {
            id,
            old_sequence,
            detached_links: referencing.len(),
            archived_videos,
            purged_videos,
        })
    }

    /// Reactivate a soft-deleted entity at the current end of its list.
    pub async fn reactivate_entity(
        &self,
        kind: EntityKind,
        id: DbId,
    ) -> RegistryResult<EntityHeader> {
        validate_id(kind.label(), id)?;
        let scope = Scope::Global(kind);

        let mut uow = self.begin().await?;
        uow.lock([scope]).await?;
        let header = EntityRepo::find_header(uow.conn(), kind, id)
            .await?
            .ok_or_else(|| guard::not_found(kind.label(), id))?;
        guard::ensure_name_available(uow.conn(), kind, &header.name, Some(id)).await?;

        let seq = engine::reactivate(&mut uow.store(), &scope, id).await?;

        let mutation =
            RegistryMutation::new(Operation::Reactivate, kind.as_str(), id).with_scopes([scope]);
        self.commit(uow, mutation).await?;
        Ok(EntityHeader {
            is_active: true,
            sequence: Some(seq),
            ..header
        })
    }

    pub async fn get_category(&self, id: DbId) -> RegistryResult<Category> {
        validate_id("Category", id)?;
        CategoryRepo::find_by_id(self.pool(), id)
            .await?
            .ok_or_else(|| guard::not_found("Category", id))
    }

    pub async fn get_workout(&self, id: DbId) -> RegistryResult<Workout> {
        validate_id("Workout", id)?;
        WorkoutRepo::find_by_id(self.pool(), id)
            .await?
            .ok_or_else(|| guard::not_found("Workout", id))
    }

    /// Categories in display order; inactive ones follow when requested.
    pub async fn list_categories(&self, include_inactive: bool) -> RegistryResult<Vec<Category>> {
        Ok(CategoryRepo::list(self.pool(), include_inactive).await?)
    }

    /// Workouts in display order; inactive ones follow when requested.
    pub async fn list_workouts(&self, include_inactive: bool) -> RegistryResult<Vec<Workout>> {
        Ok(WorkoutRepo::list(self.pool(), include_inactive).await?)
    }

    /// Active entities of `kind` in display order.
    pub async fn list_entities(&self, kind: EntityKind) -> RegistryResult<Vec<EntityHeader>> {
        Ok(EntityRepo::list_active_headers(self.pool(), kind).await?)
    }

    /// Register a video asset reference. The object itself is uploaded
    /// elsewhere.
    pub async fn create_video(&self, input: &NewVideo) -> RegistryResult<Video> {
        let title = validate_name(&input.title)?;
        let storage_key = input.storage_key.trim();
        if storage_key.is_empty() {
            return Err(CoreError::InvalidArgument("storage_key must not be empty".into()).into());
        }
        let input = NewVideo {
            title,
            storage_key: storage_key.to_string(),
            created_by: input.created_by,
        };
        let video = VideoRepo::create(self.pool(), &input).await?;
        tracing::info!(video_id = video.id, storage_key = %video.storage_key, "Video registered");
        Ok(video)
    }

    pub async fn get_video(&self, id: DbId) -> RegistryResult<Video> {
        validate_id("Video", id)?;
        VideoRepo::find_by_id(self.pool(), id)
            .await?
            .ok_or_else(|| guard::not_found("Video", id))
    }
}

/// Active association rows referencing entity `id`, across every link kind.
async fn referencing_rows(
    conn: &mut PgConnection,
    kind: EntityKind,
    id: DbId,
) -> RegistryResult<Vec<(LinkKind, LinkRow)>> {
    let mut rows = Vec::new();
    for &(link, side) in kind.referencing_links() {
        let found = LinkRepo::list_active_by_side(&mut *conn, link, side, id).await?;
        rows.extend(found.into_iter().map(|row| (link, row)));
    }
    Ok(rows)
}

fn link_scopes(rows: &[(LinkKind, LinkRow)]) -> impl Iterator<Item = Scope> + '_ {
    rows.iter()
        .map(|(link, row)| Scope::PerOwner(*link, row.owner_id))
}
