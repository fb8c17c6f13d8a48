//! Room DTOs

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::message::LastMessageDTO;
use crate::entities::Room;

lazy_static! {
    /// Room names: printable, no leading/trailing whitespace.
    static ref ROOM_NAME_RE: Regex = Regex::new(r"^\S(.*\S)?$").unwrap();
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RoomDTO {
    pub room_id: i32,
    pub name: String,
    pub is_private: bool,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Room> for RoomDTO {
    fn from(value: Room) -> Self {
        Self {
            room_id: value.room_id,
            name: value.name,
            is_private: value.is_private,
            created_by: value.created_by,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateRoomDTO {
    #[validate(
        length(min = 1, max = 255, message = "Room name must be between 1 and 255 characters"),
        regex(path = *ROOM_NAME_RE, message = "Room name must not start or end with whitespace")
    )]
    pub name: String,

    pub is_private: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct UpdateRoomDTO {
    #[validate(
        length(min = 1, max = 255, message = "Room name must be between 1 and 255 characters"),
        regex(path = *ROOM_NAME_RE, message = "Room name must not start or end with whitespace")
    )]
    pub name: Option<String>,

    pub is_private: Option<bool>,
}

/// Room listing entry with its most recent message, used by GET /rooms/all
/// and the global-stream `room_list` reply.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RoomSummaryDTO {
    pub id: i32,
    pub name: String,
    pub last_message: Option<LastMessageDTO>,
}
