//! WebSocket wire unions
//!
//! Inbound actions are discriminated by `action`, outbound events by
//! `type` with the payload under `data`:
//!
//! ```json
//! { "action": "send_message", "data": { "room_id": 1, "content": "hi" } }
//! { "type": "new_message", "data": { "message_id": 7, ... } }
//! ```
//!
//! Deserialization failures never reach the lifecycle service; the
//! connection loop answers them with an `error` event.

use serde::{Deserialize, Serialize};

use super::message::{EditMessageDTO, LastMessageDTO, MessageDTO, SendMessageDTO};
use super::query::Pagination;
use super::room::RoomSummaryDTO;

/// Inbound actions on the room-chat stream (`/ws/chat/{room_id}`).
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChatAction {
    SendMessage { data: SendMessageDTO },
    GetMessages { pagination: Option<Pagination> },
    GetMessage { message_id: i32 },
    EditMessage { data: EditMessageDTO },
    DeleteMessage { message_id: i32 },
}

/// Outbound events on the room-chat stream.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChatEvent {
    NewMessage(MessageDTO),
    MessageEdited(MessageDTO),
    MessageDeleted { message_id: i32, user_id: i32 },
    MessageHistory(Vec<MessageDTO>),
    MessageDetail(MessageDTO),
    Error { code: u16, message: String },
}

/// Inbound actions on the global stream (`/ws`).
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GlobalAction {
    GetRoomList,
}

/// Outbound events on the global stream.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GlobalEvent {
    RoomList(Vec<RoomSummaryDTO>),
    LastMessageUpdate(LastMessageDTO),
    UserOnline { user_id: i32 },
    UserOffline { user_id: i32 },
    Error { code: u16, message: String },
}
