use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::locks::KeyedLocks;
use crate::models::{Message, MessageType};
use crate::repository::Repository;
use crate::websocket::{RoomAction, ServerEvent, SessionRegistry};

const HISTORY_PAGE_CAP: i64 = 200;
const REVEAL_ATTEMPTS: u32 = 3;

pub struct SendOutcome {
    pub message: Message,
    /// False when the mandatory reveal step kept failing after the message
    /// was stored. The message is durable either way; callers surface this
    /// as a partial-success warning.
    pub revealed: bool,
}

/// Ordered, append-only per-room history with the visibility-reveal side
/// effect. The REST fallback and the live path both send through here, so
/// their semantics cannot drift apart.
pub struct MessageService;

impl MessageService {
    /// Appends a message and reveals every hidden membership of the room.
    /// Runs under the room lock, which serializes the append+reveal pair
    /// against other appends and against leave+reconcile on the same room;
    /// fan-out happens inside the lock so subscribers observe per-room
    /// events in completion order.
    pub async fn send(
        repo: &dyn Repository,
        registry: &SessionRegistry,
        room_locks: &KeyedLocks<Uuid>,
        room_id: Uuid,
        sender_id: Uuid,
        message_type: MessageType,
        content: &str,
    ) -> AppResult<SendOutcome> {
        if content.is_empty() {
            return Err(AppError::BadRequest("message content cannot be empty".into()));
        }

        let _room = room_locks.acquire(room_id).await;

        if repo.room_by_id(room_id).await?.is_none() {
            return Err(AppError::RoomNotFound);
        }
        if repo.get_membership(room_id, sender_id).await?.is_none() {
            return Err(AppError::NotMember);
        }

        let message = repo
            .insert_message(room_id, sender_id, message_type, content)
            .await?;

        // The reveal must not be skipped silently: new activity is what makes
        // a soft-left room reappear. The message's durability still wins if
        // the store keeps failing, so this is retried, then surfaced as a
        // partial success instead of rolled back.
        let mut revealed = false;
        for attempt in 1..=REVEAL_ATTEMPTS {
            match repo.reveal_hidden(room_id).await {
                Ok(count) => {
                    if count > 0 {
                        tracing::debug!(room_id = %room_id, revealed = count, "hidden memberships revealed");
                    }
                    revealed = true;
                    break;
                }
                Err(e) if attempt < REVEAL_ATTEMPTS => {
                    tracing::warn!(room_id = %room_id, attempt, error = %e, "reveal failed, retrying");
                }
                Err(e) => {
                    tracing::error!(room_id = %room_id, message_id = %message.id, error = %e, "reveal failed; message stored without revealing hidden members");
                }
            }
        }

        registry
            .dispatch(
                room_id,
                &ServerEvent::ReceiveMessage {
                    message: message.clone().into(),
                    unread_count: 1,
                },
            )
            .await;
        registry
            .broadcast_global(&ServerEvent::ChatRoomUpdated {
                room_id,
                action: RoomAction::Message,
                user_id: None,
                last_message: Some(message.content.clone()),
                last_message_at: Some(message.created_at),
            })
            .await;

        Ok(SendOutcome { message, revealed })
    }

    /// Newest-first history page for a viewer, with the hidden-member
    /// cutoff applied: a member who soft-left sees the room frozen at
    /// their leave time until some new message reveals them.
    pub async fn history(
        repo: &dyn Repository,
        room_id: Uuid,
        viewer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        if repo.room_by_id(room_id).await?.is_none() {
            return Err(AppError::RoomNotFound);
        }
        let membership = repo
            .get_membership(room_id, viewer_id)
            .await?
            .ok_or(AppError::NotMember)?;

        let limit = limit.clamp(1, HISTORY_PAGE_CAP);
        let offset = offset.max(0);
        Ok(repo
            .list_messages(room_id, membership.history_cutoff(), limit, offset)
            .await?)
    }

    /// Unscoped variant without a viewer filter, for administrative use.
    pub async fn history_unscoped(
        repo: &dyn Repository,
        room_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        if repo.room_by_id(room_id).await?.is_none() {
            return Err(AppError::RoomNotFound);
        }
        let limit = limit.clamp(1, HISTORY_PAGE_CAP);
        Ok(repo
            .list_messages(room_id, None, limit, offset.max(0))
            .await?)
    }

    /// Single-message lookup with the same per-viewer visibility rules as
    /// history.
    pub async fn get(
        repo: &dyn Repository,
        message_id: Uuid,
        viewer_id: Uuid,
    ) -> AppResult<Message> {
        let message = repo
            .message_by_id(message_id)
            .await?
            .ok_or(AppError::MessageNotFound)?;
        let membership = repo
            .get_membership(message.room_id, viewer_id)
            .await?
            .ok_or(AppError::NotMember)?;
        if let Some(cutoff) = membership.history_cutoff() {
            if message.created_at > cutoff {
                return Err(AppError::MessageNotFound);
            }
        }
        Ok(message)
    }
}
