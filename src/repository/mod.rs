use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Membership, Message, MessageType, Room};

pub mod memory;
pub mod postgres;

pub use memory::MemRepository;
pub use postgres::PgRepository;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Backend(String),
}

/// The only doorway to persistent room/membership/message state. The
/// persistent store is the single source of truth; everything above this
/// trait is either pure logic or in-memory session state.
///
/// Each method is atomic on its own (single statement or single
/// transaction). Multi-call sequences (append+reveal, find-or-create,
/// leave+reconcile) are serialized by the service layer.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Creates a room and inserts every listed user as an ACTIVE member in
    /// one transaction, so a partial failure never leaves a half-populated
    /// room behind.
    async fn create_room_with_members(
        &self,
        name: Option<String>,
        member_ids: &[Uuid],
    ) -> Result<Room, StoreError>;

    /// Adds one ACTIVE membership; a no-op if the membership already exists.
    async fn add_member(&self, room_id: Uuid, user_id: Uuid) -> Result<(), StoreError>;

    async fn get_members(&self, room_id: Uuid) -> Result<Vec<Membership>, StoreError>;

    async fn get_membership(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError>;

    /// Flips one membership's visibility. Hiding stamps `left_at`, unhiding
    /// clears it. Returns false when no membership row exists.
    async fn set_hidden(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        hidden: bool,
    ) -> Result<bool, StoreError>;

    /// Makes every hidden membership of the room visible again in one
    /// statement. Returns the number of memberships revealed.
    async fn reveal_hidden(&self, room_id: Uuid) -> Result<u64, StoreError>;

    /// Locates a room whose member set is exactly `{user_a, user_b}`,
    /// counted regardless of visibility. Newest room wins when legacy
    /// duplicates exist. Never returns a room with more than two members.
    async fn find_direct_room(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Uuid>, StoreError>;

    async fn room_by_id(&self, room_id: Uuid) -> Result<Option<Room>, StoreError>;

    /// Rooms where the user holds a visible membership, newest first.
    async fn rooms_for_user(&self, user_id: Uuid) -> Result<Vec<Room>, StoreError>;

    /// Deletes the room, cascading to its memberships and messages.
    async fn delete_room(&self, room_id: Uuid) -> Result<(), StoreError>;

    async fn insert_message(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        message_type: MessageType,
        content: &str,
    ) -> Result<Message, StoreError>;

    /// Newest-first page of a room's history. `cutoff` bounds the view for
    /// hidden members (`created_at <= cutoff`); `None` means unfiltered.
    async fn list_messages(
        &self,
        room_id: Uuid,
        cutoff: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, StoreError>;

    async fn message_by_id(&self, message_id: Uuid) -> Result<Option<Message>, StoreError>;

    async fn latest_message(&self, room_id: Uuid) -> Result<Option<Message>, StoreError>;
}
