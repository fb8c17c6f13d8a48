//! PresenceRepository - durable per-user availability state
//!
//! Presence is a side effect of global-stream connect/disconnect (and of
//! login). At most one row per user; `mark_offline` deliberately does not
//! create a row for a user who never connected.

use crate::entities::{PresenceState, PresenceStatus};
use sqlx::{Error, MySqlPool};

pub struct PresenceRepository {
    connection_pool: MySqlPool,
}

impl PresenceRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Upsert to `active`, creating the row lazily on first connect.
    pub async fn mark_active(&self, user_id: &i32) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO user_status (user_id, status) VALUES (?, 'active') \
             ON DUPLICATE KEY UPDATE status = 'active', updated_at = CURRENT_TIMESTAMP",
        )
        .bind(user_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(())
    }

    /// Update to `offline` only if a row exists; no-op otherwise.
    pub async fn mark_offline(&self, user_id: &i32) -> Result<(), Error> {
        sqlx::query("UPDATE user_status SET status = 'offline' WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(())
    }

    pub async fn set_state(&self, user_id: &i32, state: &PresenceState) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO user_status (user_id, status) VALUES (?, ?) \
             ON DUPLICATE KEY UPDATE status = VALUES(status), updated_at = CURRENT_TIMESTAMP",
        )
        .bind(user_id)
        .bind(state)
        .execute(&self.connection_pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_user(&self, user_id: &i32) -> Result<Option<PresenceStatus>, Error> {
        sqlx::query_as::<_, PresenceStatus>(
            "SELECT status_id, user_id, status, updated_at FROM user_status WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
