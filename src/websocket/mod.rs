use axum::extract::ws::Message;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod events;
pub mod handlers;

pub use events::{ClientEvent, RoomAction, ServerEvent};

pub type SessionId = Uuid;

struct SessionEntry {
    user_id: Uuid,
    handle: String,
    tx: UnboundedSender<Message>,
    rooms: HashSet<Uuid>,
}

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<SessionId, SessionEntry>,
    // room_id -> subscribed sessions, kept in lockstep with SessionEntry.rooms
    rooms: HashMap<Uuid, HashSet<SessionId>>,
}

impl RegistryInner {
    fn remove_session(&mut self, session_id: SessionId) {
        if let Some(entry) = self.sessions.remove(&session_id) {
            for room_id in entry.rooms {
                if let Some(subscribers) = self.rooms.get_mut(&room_id) {
                    subscribers.remove(&session_id);
                    if subscribers.is_empty() {
                        self.rooms.remove(&room_id);
                    }
                }
            }
        }
    }
}

/// In-memory map of live connections to identity and room subscriptions.
/// Single-process by design; persistent membership lives in the repository
/// and is never consulted here.
///
/// Delivery is best-effort: a session whose channel is gone is pruned on the
/// spot and never fails the dispatching operation.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an authenticated connection and hands back its outbound
    /// channel. Callers must have verified the identity first.
    pub async fn connect(
        &self,
        user_id: Uuid,
        handle: String,
    ) -> (SessionId, UnboundedReceiver<Message>) {
        let (tx, rx) = unbounded_channel();
        let session_id = Uuid::new_v4();
        let mut guard = self.inner.write().await;
        guard.sessions.insert(
            session_id,
            SessionEntry {
                user_id,
                handle,
                tx,
                rooms: HashSet::new(),
            },
        );
        (session_id, rx)
    }

    /// Removes the session and all of its subscriptions in one write
    /// section, so a dispatch racing the disconnect sees either the full
    /// session or nothing.
    pub async fn disconnect(&self, session_id: SessionId) {
        let mut guard = self.inner.write().await;
        guard.remove_session(session_id);
    }

    /// Adds a room subscription. Does not touch persistent membership; the
    /// caller is responsible for having authorized the user against the
    /// repository. Returns false when the session is already gone.
    pub async fn join(&self, session_id: SessionId, room_id: Uuid) -> bool {
        let mut guard = self.inner.write().await;
        let Some(entry) = guard.sessions.get_mut(&session_id) else {
            return false;
        };
        entry.rooms.insert(room_id);
        guard.rooms.entry(room_id).or_default().insert(session_id);
        true
    }

    /// Drops a room subscription only; independent of the persistent soft
    /// leave (unsubscribing a live feed does not hide the room).
    pub async fn leave(&self, session_id: SessionId, room_id: Uuid) {
        let mut guard = self.inner.write().await;
        if let Some(entry) = guard.sessions.get_mut(&session_id) {
            entry.rooms.remove(&room_id);
        }
        if let Some(subscribers) = guard.rooms.get_mut(&room_id) {
            subscribers.remove(&session_id);
            if subscribers.is_empty() {
                guard.rooms.remove(&room_id);
            }
        }
    }

    pub async fn handle_of(&self, session_id: SessionId) -> Option<String> {
        let guard = self.inner.read().await;
        guard
            .sessions
            .get(&session_id)
            .map(|entry| entry.handle.clone())
    }

    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn subscriber_count(&self, room_id: Uuid) -> usize {
        let guard = self.inner.read().await;
        guard
            .rooms
            .get(&room_id)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Best-effort delivery to every session subscribed to the room.
    pub async fn dispatch(&self, room_id: Uuid, event: &ServerEvent) {
        self.dispatch_filtered(room_id, None, event).await;
    }

    /// Same as `dispatch`, minus one session (typing relays skip the
    /// originator).
    pub async fn dispatch_except(
        &self,
        room_id: Uuid,
        except: SessionId,
        event: &ServerEvent,
    ) {
        self.dispatch_filtered(room_id, Some(except), event).await;
    }

    async fn dispatch_filtered(
        &self,
        room_id: Uuid,
        except: Option<SessionId>,
        event: &ServerEvent,
    ) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize server event");
                return;
            }
        };

        let mut guard = self.inner.write().await;
        let Some(subscribers) = guard.rooms.get(&room_id) else {
            return;
        };
        let targets: Vec<SessionId> = subscribers
            .iter()
            .copied()
            .filter(|id| Some(*id) != except)
            .collect();

        let mut stale = Vec::new();
        for session_id in targets {
            match guard.sessions.get(&session_id) {
                Some(entry) if entry.tx.send(Message::Text(payload.clone())).is_ok() => {}
                _ => stale.push(session_id),
            }
        }
        for session_id in stale {
            guard.remove_session(session_id);
        }
    }

    /// Delivery to every connected session; used only for room-list-level
    /// refresh signals.
    pub async fn broadcast_global(&self, event: &ServerEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize server event");
                return;
            }
        };

        let mut guard = self.inner.write().await;
        let targets: Vec<SessionId> = guard.sessions.keys().copied().collect();
        let mut stale = Vec::new();
        for session_id in targets {
            match guard.sessions.get(&session_id) {
                Some(entry) if entry.tx.send(Message::Text(payload.clone())).is_ok() => {}
                _ => stale.push(session_id),
            }
        }
        for session_id in stale {
            guard.remove_session(session_id);
        }
    }

    /// Sessions bound to the given user, for tests and diagnostics.
    pub async fn sessions_for_user(&self, user_id: Uuid) -> Vec<SessionId> {
        let guard = self.inner.read().await;
        guard
            .sessions
            .iter()
            .filter(|(_, entry)| entry.user_id == user_id)
            .map(|(id, _)| *id)
            .collect()
    }
}
