//! Association synchronizer and single-link operations.
//!
//! A link row lives in the scope of its owner: `PerOwner(link, owner_id)`.
//! [`Registry::sync_members`] edits one owner's list; [`Registry::sync_owners`]
//! edits every list a member appears in, so it touches one scope per
//! affected owner.

use std::collections::HashMap;

use fitreg_core::error::CoreError;
use fitreg_core::membership::{plan_sync, SyncPlan};
use fitreg_core::naming::{validate_id, validate_ids};
use fitreg_core::ordering::{engine, MoveOutcome, NextSlots};
use fitreg_core::scope::{LinkKind, LinkSide, Scope};
use fitreg_core::types::{DbId, Sequence};
use fitreg_db::models::link::LinkRow;
use fitreg_db::models::video::Video;
use fitreg_db::models::workout::Workout;
use fitreg_db::repositories::{LinkRepo, VideoRepo, WorkoutRepo};
use fitreg_events::{Operation, RegistryMutation};
use serde::Serialize;

use crate::error::RegistryResult;
use crate::guard;
use crate::registry::Registry;
use crate::unit::UnitOfWork;

/// Result of a membership sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// Ids on the other side whose links were soft-deleted.
    pub removed: Vec<DbId>,
    /// Ids on the other side whose links were left untouched.
    pub kept: Vec<DbId>,
    /// Ids on the other side that were linked (new or reactivated rows).
    pub added: Vec<DbId>,
    /// Scopes whose ordering changed.
    pub scopes: Vec<Scope>,
}

impl SyncOutcome {
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    fn from_plan(plan: SyncPlan, scopes: Vec<Scope>) -> Self {
        Self {
            removed: plan.to_remove,
            kept: plan.to_keep,
            added: plan.to_add,
            scopes,
        }
    }
}

impl Registry {
    /// Make `desired_owner_ids` the exact set of owners `member_id` is
    /// linked to.
    ///
    /// Removed owners have their list compacted; added owners get the
    /// member appended at the end of their list. Owners kept keep the
    /// member's position.
    pub async fn sync_owners(
        &self,
        link: LinkKind,
        member_id: DbId,
        desired_owner_ids: &[DbId],
        actor: Option<DbId>,
    ) -> RegistryResult<SyncOutcome> {
        validate_id(link.member_label(), member_id)?;
        validate_ids(link.owner_label(), desired_owner_ids)?;

        let mut uow = self.begin().await?;
        let seen = current_owners(&mut uow, link, member_id).await?;
        uow.lock(
            seen.iter()
                .chain(desired_owner_ids)
                .map(|&owner| Scope::PerOwner(link, owner)),
        )
        .await?;

        guard::require_active_endpoints(uow.conn(), link, LinkSide::Member, &[member_id]).await?;
        guard::require_active_endpoints(uow.conn(), link, LinkSide::Owner, desired_owner_ids)
            .await?;

        let current = LinkRepo::list_active_by_side(uow.conn(), link, LinkSide::Member, member_id)
            .await?;
        // Locked above unless a link to a new owner committed in between.
        uow.lock(current.iter().map(|row| Scope::PerOwner(link, row.owner_id)))
            .await?;

        let current_ids: Vec<DbId> = current.iter().map(|row| row.owner_id).collect();
        let plan = plan_sync(&current_ids, desired_owner_ids);
        if plan.is_noop() {
            uow.rollback().await?;
            tracing::debug!(link = link.as_str(), member_id, "Owner sync is a no-op");
            return Ok(SyncOutcome::from_plan(plan, Vec::new()));
        }

        for row in current.iter().filter(|row| plan.to_remove.contains(&row.owner_id)) {
            let scope = Scope::PerOwner(link, row.owner_id);
            engine::soft_delete_compact(&mut uow.store(), &scope, row.id).await?;
        }

        let pairs: Vec<(DbId, DbId)> = plan.to_add.iter().map(|&owner| (owner, member_id)).collect();
        append_links(&mut uow, link, &pairs, actor).await?;

        let scopes: Vec<Scope> = plan
            .to_remove
            .iter()
            .chain(&plan.to_add)
            .map(|&owner| Scope::PerOwner(link, owner))
            .collect();
        let mutation =
            RegistryMutation::new(Operation::SyncMembership, link.member_label().to_lowercase(), member_id)
                .with_scopes(scopes.iter().copied())
                .with_actor(actor);
        self.commit(uow, mutation).await?;

        tracing::info!(
            link = link.as_str(),
            member_id,
            removed = plan.to_remove.len(),
            kept = plan.to_keep.len(),
            added = plan.to_add.len(),
            "Owners synchronized"
        );
        Ok(SyncOutcome::from_plan(plan, scopes))
    }

    /// Make `desired_member_ids` the exact member set of `owner_id`'s list.
    ///
    /// New members are appended in the order given; kept members keep their
    /// positions.
    pub async fn sync_members(
        &self,
        link: LinkKind,
        owner_id: DbId,
        desired_member_ids: &[DbId],
        actor: Option<DbId>,
    ) -> RegistryResult<SyncOutcome> {
        validate_id(link.owner_label(), owner_id)?;
        validate_ids(link.member_label(), desired_member_ids)?;
        let scope = Scope::PerOwner(link, owner_id);

        let mut uow = self.begin().await?;
        uow.lock([scope]).await?;
        guard::require_active_endpoints(uow.conn(), link, LinkSide::Owner, &[owner_id]).await?;
        guard::require_active_endpoints(uow.conn(), link, LinkSide::Member, desired_member_ids)
            .await?;

        let current = LinkRepo::list_active(uow.conn(), link, owner_id).await?;
        let current_ids: Vec<DbId> = current.iter().map(|row| row.member_id).collect();
        let plan = plan_sync(&current_ids, desired_member_ids);
        if plan.is_noop() {
            uow.rollback().await?;
            tracing::debug!(link = link.as_str(), owner_id, "Member sync is a no-op");
            return Ok(SyncOutcome::from_plan(plan, Vec::new()));
        }

        // Last position first, so each compaction shifts as little as possible.
        for row in current
            .iter()
            .rev()
            .filter(|row| plan.to_remove.contains(&row.member_id))
        {
            engine::soft_delete_compact(&mut uow.store(), &scope, row.id).await?;
        }

        let pairs: Vec<(DbId, DbId)> = plan.to_add.iter().map(|&member| (owner_id, member)).collect();
        append_links(&mut uow, link, &pairs, actor).await?;

        let mutation = RegistryMutation::new(
            Operation::SyncMembership,
            link.owner_label().to_lowercase(),
            owner_id,
        )
        .with_scopes([scope])
        .with_actor(actor);
        self.commit(uow, mutation).await?;

        tracing::info!(
            link = link.as_str(),
            owner_id,
            removed = plan.to_remove.len(),
            kept = plan.to_keep.len(),
            added = plan.to_add.len(),
            "Members synchronized"
        );
        Ok(SyncOutcome::from_plan(plan, vec![scope]))
    }

    /// Link `member_id` into `owner_id`'s list, at the end or at `position`
    /// (clamped). An inactive row for the pair is reused.
    pub async fn add_member(
        &self,
        link: LinkKind,
        owner_id: DbId,
        member_id: DbId,
        position: Option<Sequence>,
        actor: Option<DbId>,
    ) -> RegistryResult<LinkRow> {
        validate_id(link.owner_label(), owner_id)?;
        validate_id(link.member_label(), member_id)?;
        let scope = Scope::PerOwner(link, owner_id);

        let mut uow = self.begin().await?;
        uow.lock([scope]).await?;
        guard::require_active_endpoints(uow.conn(), link, LinkSide::Owner, &[owner_id]).await?;
        guard::require_active_endpoints(uow.conn(), link, LinkSide::Member, &[member_id]).await?;

        let existing = LinkRepo::find_pair(uow.conn(), link, owner_id, member_id).await?;
        if existing.as_ref().is_some_and(|row| row.is_active) {
            tracing::warn!(link = link.as_str(), owner_id, member_id, "Link already active");
            return Err(CoreError::Conflict(format!(
                "{} {member_id} is already linked to {} {owner_id}",
                link.member_label(),
                link.owner_label()
            ))
            .into());
        }

        let slot = uow.claim_slot(&scope, position).await?;
        let row = match existing {
            Some(row) => {
                engine::reactivate_at(&mut uow.store(), &scope, row.id, slot).await?;
                if let Some(actor) = actor {
                    LinkRepo::touch(uow.conn(), link, &[row.id], actor).await?;
                }
                LinkRepo::find_pair(uow.conn(), link, owner_id, member_id)
                    .await?
                    .ok_or_else(|| guard::not_found(link.label(), row.id))?
            }
            None => LinkRepo::insert(uow.conn(), link, owner_id, member_id, slot, actor).await?,
        };

        let mutation = RegistryMutation::new(Operation::AddMember, link.as_str(), row.id)
            .with_scopes([scope])
            .with_actor(actor);
        self.commit(uow, mutation).await?;
        Ok(row)
    }

    /// Unlink `member_id` from `owner_id`'s list and close the gap.
    pub async fn remove_member(
        &self,
        link: LinkKind,
        owner_id: DbId,
        member_id: DbId,
        actor: Option<DbId>,
    ) -> RegistryResult<Sequence> {
        validate_id(link.owner_label(), owner_id)?;
        validate_id(link.member_label(), member_id)?;
        let scope = Scope::PerOwner(link, owner_id);

        let mut uow = self.begin().await?;
        uow.lock([scope]).await?;
        let row = active_pair(&mut uow, link, owner_id, member_id).await?;
        let old = engine::soft_delete_compact(&mut uow.store(), &scope, row.id).await?;
        if let Some(actor) = actor {
            LinkRepo::touch(uow.conn(), link, &[row.id], actor).await?;
        }

        let mutation = RegistryMutation::new(Operation::RemoveMember, link.as_str(), row.id)
            .with_scopes([scope])
            .with_actor(actor);
        self.commit(uow, mutation).await?;
        Ok(old)
    }

    /// Move `member_id` within `owner_id`'s list to `target` (clamped).
    pub async fn move_member(
        &self,
        link: LinkKind,
        owner_id: DbId,
        member_id: DbId,
        target: Sequence,
    ) -> RegistryResult<MoveOutcome> {
        validate_id(link.owner_label(), owner_id)?;
        validate_id(link.member_label(), member_id)?;
        let scope = Scope::PerOwner(link, owner_id);

        let mut uow = self.begin().await?;
        uow.lock([scope]).await?;
        let row = active_pair(&mut uow, link, owner_id, member_id).await?;
        let outcome = engine::move_to(&mut uow.store(), &scope, row.id, target).await?;
        if outcome.is_noop() {
            uow.rollback().await?;
            return Ok(outcome);
        }

        let mutation =
            RegistryMutation::new(Operation::MoveMember, link.as_str(), row.id).with_scopes([scope]);
        self.commit(uow, mutation).await?;
        Ok(outcome)
    }

    /// Active rows of `owner_id`'s list, in order.
    pub async fn list_members(&self, link: LinkKind, owner_id: DbId) -> RegistryResult<Vec<LinkRow>> {
        validate_id(link.owner_label(), owner_id)?;
        Ok(LinkRepo::list_active(self.pool(), link, owner_id).await?)
    }

    /// Active workouts of a category, in the category's order.
    pub async fn list_category_workouts(&self, category_id: DbId) -> RegistryResult<Vec<Workout>> {
        validate_id("Category", category_id)?;
        Ok(WorkoutRepo::list_for_category(self.pool(), category_id).await?)
    }

    /// Videos of a workout, in the workout's order.
    pub async fn list_workout_videos(&self, workout_id: DbId) -> RegistryResult<Vec<Video>> {
        validate_id("Workout", workout_id)?;
        Ok(VideoRepo::list_for_workout(self.pool(), workout_id).await?)
    }
}

async fn current_owners(
    uow: &mut UnitOfWork,
    link: LinkKind,
    member_id: DbId,
) -> RegistryResult<Vec<DbId>> {
    let rows = LinkRepo::list_active_by_side(uow.conn(), link, LinkSide::Member, member_id).await?;
    Ok(rows.into_iter().map(|row| row.owner_id).collect())
}

async fn active_pair(
    uow: &mut UnitOfWork,
    link: LinkKind,
    owner_id: DbId,
    member_id: DbId,
) -> RegistryResult<LinkRow> {
    match LinkRepo::find_pair(uow.conn(), link, owner_id, member_id).await? {
        Some(row) if row.is_active => Ok(row),
        _ => Err(guard::not_found(link.member_label(), member_id)),
    }
}

/// Append each `(owner, member)` pair at the end of its owner's list.
///
/// End slots for every affected owner come from one grouped query; each pair
/// then reuses its inactive row or gets a new one.
async fn append_links(
    uow: &mut UnitOfWork,
    link: LinkKind,
    pairs: &[(DbId, DbId)],
    actor: Option<DbId>,
) -> RegistryResult<()> {
    if pairs.is_empty() {
        return Ok(());
    }

    let mut owners: Vec<DbId> = pairs.iter().map(|&(owner, _)| owner).collect();
    owners.sort_unstable();
    owners.dedup();

    let maxima = LinkRepo::max_active_by_owner(uow.conn(), link, &owners).await?;
    let mut slots = NextSlots::from_max(
        maxima
            .into_iter()
            .map(|(owner, max)| (Scope::PerOwner(link, owner), max)),
    );

    let existing: HashMap<(DbId, DbId), LinkRow> = LinkRepo::find_pairs(uow.conn(), link, pairs)
        .await?
        .into_iter()
        .map(|row| ((row.owner_id, row.member_id), row))
        .collect();

    let mut reused = Vec::new();
    for &(owner, member) in pairs {
        let scope = Scope::PerOwner(link, owner);
        let slot = slots.take(scope);
        match existing.get(&(owner, member)) {
            Some(row) if row.is_active => {
                return Err(CoreError::Internal(format!(
                    "{} row {} is active but was planned as an addition",
                    link.label(),
                    row.id
                ))
                .into());
            }
            Some(row) => {
                engine::reactivate_at(&mut uow.store(), &scope, row.id, slot).await?;
                reused.push(row.id);
            }
            None => {
                LinkRepo::insert(uow.conn(), link, owner, member, slot, actor).await?;
            }
        }
    }

    if let (Some(actor), false) = (actor, reused.is_empty()) {
        LinkRepo::touch(uow.conn(), link, &reused, actor).await?;
    }
    tracing::debug!(
        link = link.as_str(),
        added = pairs.len(),
        reused = reused.len(),
        "Appended links"
    );
    Ok(())
}
