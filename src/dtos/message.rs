//! Message DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::{DeliveryState, FileAttachment, Message};

/// Outbound message representation. `status` is the requester's own
/// delivery-ledger state and is omitted on paths that do not resolve it
/// (search).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageDTO {
    pub message_id: i32,
    pub room_id: i32,
    pub sender_id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeliveryState>,
}

impl MessageDTO {
    pub fn from_message(message: Message, files: Vec<FileAttachment>) -> Self {
        Self {
            message_id: message.message_id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            content: message.content,
            created_at: message.created_at,
            updated_at: message.updated_at,
            files: files.into_iter().map(|f| f.file_url).collect(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: DeliveryState) -> Self {
        self.status = Some(status);
        self
    }
}

impl From<Message> for MessageDTO {
    fn from(value: Message) -> Self {
        Self::from_message(value, Vec::new())
    }
}

/// Inbound payload of the `send_message` action and POST /messages.
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct SendMessageDTO {
    pub room_id: i32,

    #[validate(length(
        min = 1,
        max = 5000,
        message = "Message content must be between 1 and 5000 characters"
    ))]
    pub content: String,
}

/// Inbound payload of the `edit_message` action and PUT /messages.
/// `file_urls` replaces the attachment set wholesale; an empty list
/// removes every attachment.
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct EditMessageDTO {
    pub message_id: i32,

    #[validate(length(
        min = 1,
        max = 5000,
        message = "Message content must be between 1 and 5000 characters"
    ))]
    pub new_content: Option<String>,

    #[serde(default)]
    pub file_urls: Vec<String>,
}

/// Compact message shape pushed on the global stream and embedded in room
/// listings.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LastMessageDTO {
    pub message_id: i32,
    pub room_id: i32,
    pub sender_id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for LastMessageDTO {
    fn from(value: &Message) -> Self {
        Self {
            message_id: value.message_id,
            room_id: value.room_id,
            sender_id: value.sender_id,
            content: value.content.clone(),
            created_at: value.created_at,
        }
    }
}
