//! Room and membership entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Room {
    pub room_id: i32,
    pub name: String,
    pub is_private: bool,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row per (room, user) pair; deleted on leave/removal.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct RoomMembership {
    pub membership_id: i32,
    pub room_id: i32,
    pub user_id: i32,
    pub joined_at: DateTime<Utc>,
}
