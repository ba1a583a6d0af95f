use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's belonging record to a room, independent of live connection
/// state. Exists iff the user logically belongs to the room; soft leave
/// flips `visible` off instead of deleting the row, so shared history
/// survives until the room itself is reclaimed.
///
/// ACTIVE (visible, left_at = None) ⇄ HIDDEN (not visible, left_at = Some).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub visible: bool,
    pub left_at: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn is_hidden(&self) -> bool {
        !self.visible
    }

    /// The history cutoff for this viewer: a hidden member sees the room
    /// frozen at their leave time, an active member sees everything.
    pub fn history_cutoff(&self) -> Option<DateTime<Utc>> {
        if self.visible {
            None
        } else {
            self.left_at
        }
    }
}
