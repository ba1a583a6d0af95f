use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A container of participants sharing one message history. Created on
/// demand; deleted only by the lifecycle reconciler. A direct (1:1) room is
/// identified structurally by having exactly two memberships, counted
/// regardless of visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}
