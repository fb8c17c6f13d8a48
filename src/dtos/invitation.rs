//! Invitation DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::InvitationState;

/// Invitation joined with its 1:1 status row, as returned by the sent /
/// received listings.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct InvitationDTO {
    pub invitation_id: i32,
    pub room_id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub status: InvitationState,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RoomInviteDTO {
    pub room_id: i32,
    pub receiver_id: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RespondInvitationDTO {
    pub invitation_id: i32,
    pub accept: bool,
}
