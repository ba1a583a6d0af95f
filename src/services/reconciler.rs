use uuid::Uuid;

use crate::repository::{Repository, StoreError};

/// Reclaims rooms with no remaining visible member. Runs after every leave;
/// a failed pass is retried by whichever leave touches the room next.
pub struct Reconciler;

impl Reconciler {
    /// Fire-and-forget wrapper: failures are logged and swallowed so the
    /// caller's leave still succeeds. Returns whether the room was deleted.
    pub async fn check_and_reclaim(repo: &dyn Repository, room_id: Uuid) -> bool {
        match Self::try_reclaim(repo, room_id).await {
            Ok(reclaimed) => reclaimed,
            Err(e) => {
                tracing::warn!(room_id = %room_id, error = %e, "room reclaim failed; a later leave will retry");
                false
            }
        }
    }

    async fn try_reclaim(repo: &dyn Repository, room_id: Uuid) -> Result<bool, StoreError> {
        let members = repo.get_members(room_id).await?;
        let total = members.len();
        let hidden = members.iter().filter(|m| m.is_hidden()).count();

        if total > 0 && hidden == total {
            repo.delete_room(room_id).await?;
            tracing::info!(room_id = %room_id, members = total, "reclaimed room with no visible members");
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemRepository;

    #[tokio::test]
    async fn keeps_room_while_any_member_is_visible() {
        let repo = MemRepository::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let room = repo
            .create_room_with_members(None, &[a, b])
            .await
            .expect("create room");
        repo.set_hidden(room.id, a, true).await.expect("hide");

        assert!(!Reconciler::check_and_reclaim(&repo, room.id).await);
        assert!(repo.room_by_id(room.id).await.expect("room").is_some());
    }

    #[tokio::test]
    async fn reclaims_room_once_all_members_are_hidden() {
        let repo = MemRepository::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let room = repo
            .create_room_with_members(None, &[a, b])
            .await
            .expect("create room");
        repo.set_hidden(room.id, a, true).await.expect("hide");
        repo.set_hidden(room.id, b, true).await.expect("hide");

        assert!(Reconciler::check_and_reclaim(&repo, room.id).await);
        assert!(repo.room_by_id(room.id).await.expect("room").is_none());
    }

    #[tokio::test]
    async fn ignores_rooms_with_no_members_at_all() {
        let repo = MemRepository::new();
        let room = repo
            .create_room_with_members(None, &[])
            .await
            .expect("create room");

        assert!(!Reconciler::check_and_reclaim(&repo, room.id).await);
        assert!(repo.room_by_id(room.id).await.expect("room").is_some());
    }
}
