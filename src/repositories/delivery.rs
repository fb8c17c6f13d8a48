//! DeliveryRepository - the delivery ledger
//!
//! One row per (message, room-member-at-send-time) pair; the durable
//! source of truth for per-recipient message state. All transitions here
//! are keyed by the acting user's own row only.

use super::Read;
use crate::entities::DeliveryStatus;
use sqlx::{Error, MySqlPool};

const DELIVERY_COLUMNS: &str = "delivery_id, message_id, user_id, status, updated_at";

pub struct DeliveryRepository {
    connection_pool: MySqlPool,
}

impl DeliveryRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Recipient read: delivered → viewed. Re-viewing stays viewed; a
    /// deleted row is never touched.
    pub async fn mark_viewed(&self, message_id: &i32, user_id: &i32) -> Result<(), Error> {
        sqlx::query(
            "UPDATE delivery_status SET status = 'viewed', updated_at = CURRENT_TIMESTAMP \
             WHERE message_id = ? AND user_id = ? AND status IN ('sent', 'delivered', 'viewed')",
        )
        .bind(message_id)
        .bind(user_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(())
    }

    /// Bulk transition for a returned history page.
    pub async fn mark_viewed_many(
        &self,
        message_ids: &[i32],
        user_id: &i32,
    ) -> Result<(), Error> {
        if message_ids.is_empty() {
            return Ok(());
        }
        let mut builder = sqlx::QueryBuilder::new(
            "UPDATE delivery_status SET status = 'viewed', updated_at = CURRENT_TIMESTAMP \
             WHERE user_id = ",
        );
        builder.push_bind(user_id);
        builder.push(" AND status IN ('sent', 'delivered', 'viewed') AND message_id IN (");
        let mut separated = builder.separated(", ");
        for id in message_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");
        builder.build().execute(&self.connection_pool).await?;
        Ok(())
    }

    /// Soft delete of the acting user's own row. Terminal and idempotent:
    /// updating zero rows is a success.
    pub async fn mark_deleted(&self, message_id: &i32, user_id: &i32) -> Result<(), Error> {
        sqlx::query(
            "UPDATE delivery_status SET status = 'deleted', updated_at = CURRENT_TIMESTAMP \
             WHERE message_id = ? AND user_id = ?",
        )
        .bind(message_id)
        .bind(user_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(())
    }

    pub async fn statuses_for_message(
        &self,
        message_id: &i32,
    ) -> Result<Vec<DeliveryStatus>, Error> {
        sqlx::query_as::<_, DeliveryStatus>(&format!(
            "SELECT {} FROM delivery_status WHERE message_id = ? ORDER BY user_id",
            DELIVERY_COLUMNS
        ))
        .bind(message_id)
        .fetch_all(&self.connection_pool)
        .await
    }
}

impl Read<DeliveryStatus, (i32, i32)> for DeliveryRepository {
    /// Primary key is the (message_id, user_id) pair.
    async fn read(&self, id: &(i32, i32)) -> Result<Option<DeliveryStatus>, Error> {
        sqlx::query_as::<_, DeliveryStatus>(&format!(
            "SELECT {} FROM delivery_status WHERE message_id = ? AND user_id = ?",
            DELIVERY_COLUMNS
        ))
        .bind(id.0)
        .bind(id.1)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
