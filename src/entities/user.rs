//! User entity and its one-to-one presence row

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::PresenceState;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub auth_provider: Option<String>,
    pub auth_id: Option<String>,
    pub avatar_url: Option<String>,
    // never serialized out to clients, see UserDTO
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// At most one row per user; created lazily on first login/connect.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct PresenceStatus {
    pub status_id: i32,
    pub user_id: i32,
    pub status: PresenceState,
    pub updated_at: DateTime<Utc>,
}
