use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use super::{Repository, StoreError};
use crate::models::{Membership, Message, MessageType, Room};

#[derive(Default)]
struct MemInner {
    // insertion order doubles as creation order for same-timestamp rooms
    rooms: Vec<Room>,
    members: HashMap<Uuid, Vec<Membership>>,
    messages: HashMap<Uuid, Vec<Message>>,
}

/// In-memory repository with the same observable semantics as the Postgres
/// implementation. Backs the test suite and database-free local runs.
#[derive(Default)]
pub struct MemRepository {
    inner: Mutex<MemInner>,
    reveal_failures: AtomicUsize,
}

impl MemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` `reveal_hidden` calls fail, for exercising the
    /// partial-success path of message append.
    pub fn inject_reveal_failures(&self, n: usize) {
        self.reveal_failures.store(n, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Repository for MemRepository {
    async fn create_room_with_members(
        &self,
        name: Option<String>,
        member_ids: &[Uuid],
    ) -> Result<Room, StoreError> {
        let room = Room {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
        };
        let mut inner = self.lock();
        let memberships = member_ids
            .iter()
            .map(|&user_id| Membership {
                room_id: room.id,
                user_id,
                visible: true,
                left_at: None,
                joined_at: room.created_at,
            })
            .collect();
        inner.members.insert(room.id, memberships);
        inner.messages.insert(room.id, Vec::new());
        inner.rooms.push(room.clone());
        Ok(room)
    }

    async fn add_member(&self, room_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let members = inner
            .members
            .get_mut(&room_id)
            .ok_or_else(|| StoreError::Backend(format!("room {room_id} missing")))?;
        if members.iter().any(|m| m.user_id == user_id) {
            return Ok(());
        }
        members.push(Membership {
            room_id,
            user_id,
            visible: true,
            left_at: None,
            joined_at: Utc::now(),
        });
        Ok(())
    }

    async fn get_members(&self, room_id: Uuid) -> Result<Vec<Membership>, StoreError> {
        let inner = self.lock();
        Ok(inner.members.get(&room_id).cloned().unwrap_or_default())
    }

    async fn get_membership(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .members
            .get(&room_id)
            .and_then(|members| members.iter().find(|m| m.user_id == user_id).cloned()))
    }

    async fn set_hidden(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        hidden: bool,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let Some(members) = inner.members.get_mut(&room_id) else {
            return Ok(false);
        };
        let Some(membership) = members.iter_mut().find(|m| m.user_id == user_id) else {
            return Ok(false);
        };
        membership.visible = !hidden;
        membership.left_at = if hidden { Some(Utc::now()) } else { None };
        Ok(true)
    }

    async fn reveal_hidden(&self, room_id: Uuid) -> Result<u64, StoreError> {
        let pending = self.reveal_failures.load(Ordering::SeqCst);
        if pending > 0
            && self
                .reveal_failures
                .compare_exchange(pending, pending - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return Err(StoreError::Backend("injected reveal failure".into()));
        }

        let mut inner = self.lock();
        let Some(members) = inner.members.get_mut(&room_id) else {
            return Ok(0);
        };
        let mut revealed = 0;
        for membership in members.iter_mut().filter(|m| !m.visible) {
            membership.visible = true;
            membership.left_at = None;
            revealed += 1;
        }
        Ok(revealed)
    }

    async fn find_direct_room(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Uuid>, StoreError> {
        let inner = self.lock();
        // newest room first; visibility does not matter for dedup
        Ok(inner
            .rooms
            .iter()
            .rev()
            .find(|room| {
                inner
                    .members
                    .get(&room.id)
                    .map(|members| {
                        members.len() == 2
                            && members.iter().any(|m| m.user_id == user_a)
                            && members.iter().any(|m| m.user_id == user_b)
                    })
                    .unwrap_or(false)
            })
            .map(|room| room.id))
    }

    async fn room_by_id(&self, room_id: Uuid) -> Result<Option<Room>, StoreError> {
        let inner = self.lock();
        Ok(inner.rooms.iter().find(|r| r.id == room_id).cloned())
    }

    async fn rooms_for_user(&self, user_id: Uuid) -> Result<Vec<Room>, StoreError> {
        let inner = self.lock();
        let mut rooms: Vec<Room> = inner
            .rooms
            .iter()
            .filter(|room| {
                inner
                    .members
                    .get(&room.id)
                    .map(|members| {
                        members
                            .iter()
                            .any(|m| m.user_id == user_id && m.visible)
                    })
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        rooms.reverse();
        Ok(rooms)
    }

    async fn delete_room(&self, room_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.rooms.retain(|r| r.id != room_id);
        inner.members.remove(&room_id);
        inner.messages.remove(&room_id);
        Ok(())
    }

    async fn insert_message(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        message_type: MessageType,
        content: &str,
    ) -> Result<Message, StoreError> {
        let mut inner = self.lock();
        if !inner.rooms.iter().any(|r| r.id == room_id) {
            return Err(StoreError::Backend(format!("room {room_id} missing")));
        }
        let message = Message {
            id: Uuid::new_v4(),
            room_id,
            sender_id,
            message_type,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        inner
            .messages
            .entry(room_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn list_messages(
        &self,
        room_id: Uuid,
        cutoff: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, StoreError> {
        let inner = self.lock();
        let mut page: Vec<Message> = inner
            .messages
            .get(&room_id)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| cutoff.map(|c| m.created_at <= c).unwrap_or(true))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        page.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(page
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn message_by_id(&self, message_id: Uuid) -> Result<Option<Message>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .messages
            .values()
            .flat_map(|messages| messages.iter())
            .find(|m| m.id == message_id)
            .cloned())
    }

    async fn latest_message(&self, room_id: Uuid) -> Result<Option<Message>, StoreError> {
        let inner = self.lock();
        Ok(inner.messages.get(&room_id).and_then(|messages| {
            messages
                .iter()
                .max_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)))
                .cloned()
        }))
    }
}
