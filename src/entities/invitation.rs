//! Room invitation entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::InvitationState;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct RoomInvitation {
    pub invitation_id: i32,
    pub room_id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Owned 1:1 status row, default `pending`, mutated exactly once by the
/// receiver.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct InvitationStatus {
    pub status_id: i32,
    pub invitation_id: i32,
    pub status: InvitationState,
    pub updated_at: DateTime<Utc>,
}
