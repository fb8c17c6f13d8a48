//! User DTOs

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::{PresenceState, User};

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();
}

/// Public user shape; auth linkage and refresh token never leave the
/// server.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserDTO {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PresenceState>,
}

impl From<User> for UserDTO {
    fn from(value: User) -> Self {
        Self {
            user_id: value.user_id,
            username: value.username,
            email: value.email,
            avatar_url: value.avatar_url,
            status: None,
        }
    }
}

impl UserDTO {
    pub fn with_status(mut self, status: Option<PresenceState>) -> Self {
        self.status = status;
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdatePresenceDTO {
    pub status: PresenceState,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct UpdateUsernameDTO {
    #[validate(
        length(min = 1, max = 16, message = "Username must be between 1 and 16 characters"),
        regex(path = *USERNAME_RE, message = "Username may contain letters, digits, '_', '.' and '-'")
    )]
    pub username: String,
}
