use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{MessageDto, MessageType};

/// Room-list refresh reasons carried by `chat_room_updated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomAction {
    Created,
    Joined,
    Left,
    Message,
}

/// Events the server pushes to live sessions.
///
/// `receive_message`, `user_typing` and `message_read_update` are dispatched
/// only to sessions subscribed to the room; `chat_room_updated` is the one
/// global signal, so users outside the room still see their room list
/// reorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    ReceiveMessage {
        message: MessageDto,
        unread_count: u32,
    },
    ChatRoomUpdated {
        room_id: Uuid,
        action: RoomAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_id: Option<Uuid>,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_message_at: Option<DateTime<Utc>>,
    },
    UserTyping {
        room_id: Uuid,
        handle: String,
        // the live clients already speak camelCase for this one field
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
    MessageReadUpdate {
        message_id: Uuid,
        room_id: Uuid,
        unread_count: u32,
    },
}

/// Events a live client may send after the authenticated handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom {
        room_id: Uuid,
    },
    LeaveRoom {
        room_id: Uuid,
    },
    SendMessage {
        room_id: Uuid,
        content: String,
        #[serde(default)]
        message_type: MessageType,
    },
    TypingStart {
        room_id: Uuid,
    },
    TypingStop {
        room_id: Uuid,
    },
    MessageRead {
        message_id: Uuid,
        room_id: Uuid,
    },
}
