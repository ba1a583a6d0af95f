use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::locks::KeyedLocks;
use crate::repository::Repository;
use crate::services::reconciler::Reconciler;

/// Per (room, user) visibility lifecycle: ACTIVE ⇄ HIDDEN. Memberships are
/// created on join, mutated (never deleted) on leave, and only removed by
/// the room cascade-delete in the reconciler.
pub struct MembershipService;

impl MembershipService {
    /// Soft leave: ACTIVE → HIDDEN with `left_at = now`, then gives the
    /// reconciler a chance to reclaim the room. Requires an existing
    /// membership. Leaving while already hidden keeps the original
    /// `left_at` so the frozen view does not move.
    ///
    /// The room lock is held across the transition and the reclaim check,
    /// so a concurrent append's reveal on the same room cannot interleave.
    pub async fn leave(
        repo: &dyn Repository,
        room_locks: &KeyedLocks<Uuid>,
        room_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<()> {
        let _room = room_locks.acquire(room_id).await;

        let membership = repo
            .get_membership(room_id, user_id)
            .await?
            .ok_or(AppError::NotMember)?;

        if membership.visible {
            repo.set_hidden(room_id, user_id, true).await?;
            tracing::debug!(room_id = %room_id, user_id = %user_id, "membership hidden");
        }

        // outcome intentionally ignored: reclaim failures never fail a leave
        Reconciler::check_and_reclaim(repo, room_id).await;
        Ok(())
    }
}
