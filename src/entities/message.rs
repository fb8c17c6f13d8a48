//! Message, delivery ledger and attachment entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::DeliveryState;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub message_id: i32,
    pub room_id: i32,
    pub sender_id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The delivery ledger: exactly one row per (message, room-member-at-send-
/// time) pair. This is the durable source of truth for "has user X seen
/// message Y"; live pushes are best effort on top of it.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct DeliveryStatus {
    pub delivery_id: i32,
    pub message_id: i32,
    pub user_id: i32,
    pub status: DeliveryState,
    pub updated_at: DateTime<Utc>,
}

/// Owned exclusively by one message, replaced wholesale on edit.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct FileAttachment {
    pub attachment_id: i32,
    pub message_id: i32,
    pub file_url: String,
    pub created_at: DateTime<Utc>,
}
