use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::locks::{pair_key, KeyedLocks};
use crate::models::{Membership, Message, Room};
use crate::repository::Repository;

pub struct DirectRoomOutcome {
    pub room: Room,
    /// Distinguishes found-vs-created so callers can decide whether to
    /// announce the creation.
    pub created: bool,
}

pub struct RoomOverview {
    pub room: Room,
    pub membership: Membership,
    pub last_message: Option<Message>,
    pub participants: Vec<Membership>,
}

/// Room lookup and creation. The direct-room dedup invariant lives here.
pub struct RoomService;

impl RoomService {
    /// Locates the direct room for this pair, or atomically creates a room
    /// plus two ACTIVE memberships. The whole read-then-maybe-create runs
    /// under a lock keyed by the sorted pair, so two users racing to start
    /// the same conversation end up in one room.
    pub async fn find_or_create_direct(
        repo: &dyn Repository,
        pair_locks: &KeyedLocks<(Uuid, Uuid)>,
        requester: Uuid,
        participant_ids: &[Uuid],
    ) -> AppResult<DirectRoomOutcome> {
        let [user_a, user_b] = participant_ids else {
            return Err(AppError::InvalidParticipants(
                "exactly two participant ids required".into(),
            ));
        };
        let (user_a, user_b) = (*user_a, *user_b);
        if user_a == user_b {
            return Err(AppError::InvalidParticipants(
                "participant ids must be distinct".into(),
            ));
        }
        if requester != user_a && requester != user_b {
            return Err(AppError::InvalidParticipants(
                "requester must be one of the participants".into(),
            ));
        }

        let _pair = pair_locks.acquire(pair_key(user_a, user_b)).await;

        if let Some(existing_id) = repo.find_direct_room(user_a, user_b).await? {
            if let Some(room) = repo.room_by_id(existing_id).await? {
                return Ok(DirectRoomOutcome {
                    room,
                    created: false,
                });
            }
        }

        let room = repo
            .create_room_with_members(None, &[user_a, user_b])
            .await?;
        tracing::info!(room_id = %room.id, "created direct room");
        Ok(DirectRoomOutcome {
            room,
            created: true,
        })
    }

    /// Creates a group room with the creator and every listed member as one
    /// atomic set-insertion, so a partial failure cannot leave an
    /// inconsistent room behind.
    pub async fn create_group(
        repo: &dyn Repository,
        creator: Uuid,
        name: Option<String>,
        member_ids: &[Uuid],
    ) -> AppResult<Room> {
        if let Some(ref name) = name {
            if name.trim().is_empty() {
                return Err(AppError::BadRequest("room name cannot be blank".into()));
            }
            if name.len() > 255 {
                return Err(AppError::BadRequest("room name too long (max 255)".into()));
            }
        }

        let mut all_members = vec![creator];
        for member_id in member_ids {
            if !all_members.contains(member_id) {
                all_members.push(*member_id);
            }
        }

        let room = repo.create_room_with_members(name, &all_members).await?;
        tracing::info!(room_id = %room.id, members = all_members.len(), "created group room");
        Ok(room)
    }

    /// The caller's visible rooms with their last message and participant
    /// list, for the room-list screen.
    pub async fn list_overviews(
        repo: &dyn Repository,
        user_id: Uuid,
    ) -> AppResult<Vec<RoomOverview>> {
        let rooms = repo.rooms_for_user(user_id).await?;
        let mut overviews = Vec::with_capacity(rooms.len());
        for room in rooms {
            let participants = repo.get_members(room.id).await?;
            let Some(membership) = participants
                .iter()
                .find(|m| m.user_id == user_id)
                .cloned()
            else {
                // room was reclaimed between the two reads; skip it
                continue;
            };
            let last_message = repo.latest_message(room.id).await?;
            overviews.push(RoomOverview {
                room,
                membership,
                last_message,
                participants,
            });
        }
        Ok(overviews)
    }

    /// Room detail for a member. Hidden members still belong to the room
    /// and may read it (their history stays frozen at the leave cutoff).
    pub async fn detail(
        repo: &dyn Repository,
        room_id: Uuid,
        viewer_id: Uuid,
    ) -> AppResult<(Room, Vec<Membership>)> {
        let room = repo
            .room_by_id(room_id)
            .await?
            .ok_or(AppError::RoomNotFound)?;
        let members = repo.get_members(room_id).await?;
        if !members.iter().any(|m| m.user_id == viewer_id) {
            return Err(AppError::NotMember);
        }
        Ok((room, members))
    }

    /// Adds a user to a room as an ACTIVE member. Only existing members may
    /// add; re-adding an existing member is a no-op.
    pub async fn add_member(
        repo: &dyn Repository,
        room_id: Uuid,
        requester: Uuid,
        new_member: Uuid,
    ) -> AppResult<()> {
        let room = repo.room_by_id(room_id).await?;
        if room.is_none() {
            return Err(AppError::RoomNotFound);
        }
        if repo.get_membership(room_id, requester).await?.is_none() {
            return Err(AppError::NotMember);
        }
        repo.add_member(room_id, new_member).await?;
        tracing::debug!(room_id = %room_id, user_id = %new_member, "member added");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemRepository;

    fn locks() -> KeyedLocks<(Uuid, Uuid)> {
        KeyedLocks::new()
    }

    #[tokio::test]
    async fn second_call_finds_the_created_room() {
        let repo = MemRepository::new();
        let pair_locks = locks();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let first = RoomService::find_or_create_direct(&repo, &pair_locks, a, &[a, b])
            .await
            .expect("create");
        assert!(first.created);

        let second = RoomService::find_or_create_direct(&repo, &pair_locks, b, &[b, a])
            .await
            .expect("find");
        assert!(!second.created);
        assert_eq!(first.room.id, second.room.id);
    }

    #[tokio::test]
    async fn rejects_bad_participant_sets() {
        let repo = MemRepository::new();
        let pair_locks = locks();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        for participants in [vec![a], vec![a, a], vec![a, b, Uuid::new_v4()]] {
            let result =
                RoomService::find_or_create_direct(&repo, &pair_locks, a, &participants).await;
            assert!(matches!(result, Err(AppError::InvalidParticipants(_))));
        }

        // requester outside the pair
        let result =
            RoomService::find_or_create_direct(&repo, &pair_locks, Uuid::new_v4(), &[a, b]).await;
        assert!(matches!(result, Err(AppError::InvalidParticipants(_))));
    }

    #[tokio::test]
    async fn group_creation_dedups_members_and_includes_creator() {
        let repo = MemRepository::new();
        let creator = Uuid::new_v4();
        let other = Uuid::new_v4();

        let room = RoomService::create_group(
            &repo,
            creator,
            Some("lunch".into()),
            &[other, creator, other],
        )
        .await
        .expect("create group");

        let members = repo.get_members(room.id).await.expect("members");
        assert_eq!(members.len(), 2);
        assert!(members.iter().any(|m| m.user_id == creator));
        assert!(members.iter().any(|m| m.user_id == other));
    }

    #[tokio::test]
    async fn hidden_rooms_are_absent_from_overviews() {
        let repo = MemRepository::new();
        let pair_locks = locks();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let outcome = RoomService::find_or_create_direct(&repo, &pair_locks, a, &[a, b])
            .await
            .expect("create");
        repo.set_hidden(outcome.room.id, a, true)
            .await
            .expect("hide");

        assert!(RoomService::list_overviews(&repo, a)
            .await
            .expect("list")
            .is_empty());
        assert_eq!(
            RoomService::list_overviews(&repo, b)
                .await
                .expect("list")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn detail_requires_membership() {
        let repo = MemRepository::new();
        let a = Uuid::new_v4();
        let room = repo
            .create_room_with_members(None, &[a])
            .await
            .expect("create");

        assert!(matches!(
            RoomService::detail(&repo, room.id, Uuid::new_v4()).await,
            Err(AppError::NotMember)
        ));
        assert!(matches!(
            RoomService::detail(&repo, Uuid::new_v4(), a).await,
            Err(AppError::RoomNotFound)
        ));
        assert!(RoomService::detail(&repo, room.id, a).await.is_ok());
    }
}
