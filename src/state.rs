use crate::{
    auth::Authenticator, config::Config, locks::KeyedLocks, repository::Repository,
    websocket::SessionRegistry,
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub auth: Arc<dyn Authenticator>,
    pub registry: SessionRegistry,
    pub config: Arc<Config>,
    /// Serializes append+reveal and leave+reconcile per room.
    pub room_locks: KeyedLocks<Uuid>,
    /// Serializes direct-room find-or-create per unordered user pair.
    pub pair_locks: KeyedLocks<(Uuid, Uuid)>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn Repository>,
        auth: Arc<dyn Authenticator>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            repo,
            auth,
            registry: SessionRegistry::new(),
            config,
            room_locks: KeyedLocks::new(),
            pair_locks: KeyedLocks::new(),
        }
    }
}
