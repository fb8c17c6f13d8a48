//! MessageRepository - messages, attachments and the atomic writes that
//! keep the delivery ledger consistent with them

use super::Read;
use crate::entities::{FileAttachment, Message};
use sqlx::{Error, MySqlPool};

const MESSAGE_COLUMNS: &str = "message_id, room_id, sender_id, content, created_at, updated_at";
const ATTACHMENT_COLUMNS: &str = "attachment_id, message_id, file_url, created_at";

pub struct MessageRepository {
    connection_pool: MySqlPool,
}

impl MessageRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Send: inserts the message, one ledger row per room member at send
    /// time (sender `sent`, everyone else `delivered`) and the staged
    /// attachments, all in one transaction. Nothing is observable until
    /// the commit.
    pub async fn create_with_ledger(
        &self,
        room_id: &i32,
        sender_id: &i32,
        content: &str,
        member_ids: &[i32],
        file_urls: &[String],
    ) -> Result<Message, Error> {
        let mut tx = self.connection_pool.begin().await?;

        let result = sqlx::query("INSERT INTO messages (room_id, sender_id, content) VALUES (?, ?, ?)")
            .bind(room_id)
            .bind(sender_id)
            .bind(content)
            .execute(&mut *tx)
            .await?;
        let message_id = result.last_insert_id() as i32;

        for member_id in member_ids {
            let status = if member_id == sender_id { "sent" } else { "delivered" };
            sqlx::query("INSERT INTO delivery_status (message_id, user_id, status) VALUES (?, ?, ?)")
                .bind(message_id)
                .bind(member_id)
                .bind(status)
                .execute(&mut *tx)
                .await?;
        }

        for url in file_urls {
            sqlx::query("INSERT INTO file_attachments (message_id, file_url) VALUES (?, ?)")
                .bind(message_id)
                .bind(url)
                .execute(&mut *tx)
                .await?;
        }

        // Read-your-writes inside the transaction for the generated
        // timestamps.
        let message = sqlx::query_as::<_, Message>(&format!(
            "SELECT {} FROM messages WHERE message_id = ?",
            MESSAGE_COLUMNS
        ))
        .bind(message_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Edit: content update, wholesale attachment replacement and the
    /// ledger reset of every other recipient's non-deleted row, atomically.
    pub async fn update_with_reset(
        &self,
        message_id: &i32,
        new_content: Option<&str>,
        file_urls: &[String],
        editor_id: &i32,
    ) -> Result<Message, Error> {
        let mut tx = self.connection_pool.begin().await?;

        if let Some(content) = new_content {
            sqlx::query(
                "UPDATE messages SET content = ?, updated_at = CURRENT_TIMESTAMP \
                 WHERE message_id = ?",
            )
            .bind(content)
            .bind(message_id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query("UPDATE messages SET updated_at = CURRENT_TIMESTAMP WHERE message_id = ?")
                .bind(message_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM file_attachments WHERE message_id = ?")
            .bind(message_id)
            .execute(&mut *tx)
            .await?;

        for url in file_urls {
            sqlx::query("INSERT INTO file_attachments (message_id, file_url) VALUES (?, ?)")
                .bind(message_id)
                .bind(url)
                .execute(&mut *tx)
                .await?;
        }

        // The edit invalidates what other recipients have seen; deleted
        // rows stay deleted.
        sqlx::query(
            "UPDATE delivery_status \
             SET status = 'delivered', updated_at = CURRENT_TIMESTAMP \
             WHERE message_id = ? AND user_id != ? AND status != 'deleted'",
        )
        .bind(message_id)
        .bind(editor_id)
        .execute(&mut *tx)
        .await?;

        let message = sqlx::query_as::<_, Message>(&format!(
            "SELECT {} FROM messages WHERE message_id = ?",
            MESSAGE_COLUMNS
        ))
        .bind(message_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// A message is visible to a requester only through their own ledger
    /// row (their `sent` row for their own messages, delivered/viewed
    /// otherwise); absent and not-visible are the same `None` to the
    /// caller.
    pub async fn find_visible_by_id(
        &self,
        message_id: &i32,
        user_id: &i32,
    ) -> Result<Option<Message>, Error> {
        sqlx::query_as::<_, Message>(
            "SELECT m.message_id, m.room_id, m.sender_id, m.content, m.created_at, m.updated_at \
             FROM messages m \
             JOIN delivery_status d ON d.message_id = m.message_id \
             WHERE m.message_id = ? AND d.user_id = ? AND d.status IN ('sent', 'delivered', 'viewed')",
        )
        .bind(message_id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Visible page of a room's history, creation order ascending.
    pub async fn find_visible_by_room(
        &self,
        room_id: &i32,
        user_id: &i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(
            "SELECT m.message_id, m.room_id, m.sender_id, m.content, m.created_at, m.updated_at \
             FROM messages m \
             JOIN delivery_status d ON d.message_id = m.message_id \
             WHERE m.room_id = ? AND d.user_id = ? AND d.status IN ('sent', 'delivered', 'viewed') \
             ORDER BY m.created_at ASC, m.message_id ASC \
             LIMIT ? OFFSET ?",
        )
        .bind(room_id)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Case-insensitive substring search, restricted to what the
    /// requester may see.
    pub async fn search_visible(
        &self,
        room_id: &i32,
        user_id: &i32,
        text: &str,
    ) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(
            "SELECT m.message_id, m.room_id, m.sender_id, m.content, m.created_at, m.updated_at \
             FROM messages m \
             JOIN delivery_status d ON d.message_id = m.message_id \
             WHERE m.room_id = ? AND d.user_id = ? AND d.status IN ('sent', 'delivered', 'viewed') \
               AND LOWER(m.content) LIKE ? \
             ORDER BY m.created_at ASC, m.message_id ASC",
        )
        .bind(room_id)
        .bind(user_id)
        .bind(format!("%{}%", text.to_lowercase()))
        .fetch_all(&self.connection_pool)
        .await
    }

    pub async fn attachments(&self, message_id: &i32) -> Result<Vec<FileAttachment>, Error> {
        sqlx::query_as::<_, FileAttachment>(&format!(
            "SELECT {} FROM file_attachments WHERE message_id = ? ORDER BY attachment_id",
            ATTACHMENT_COLUMNS
        ))
        .bind(message_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Attachments for a whole page of messages in one query.
    pub async fn attachments_for_messages(
        &self,
        message_ids: &[i32],
    ) -> Result<Vec<FileAttachment>, Error> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = sqlx::QueryBuilder::new(format!(
            "SELECT {} FROM file_attachments WHERE message_id IN (",
            ATTACHMENT_COLUMNS
        ));
        let mut separated = builder.separated(", ");
        for id in message_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") ORDER BY attachment_id");
        builder
            .build_query_as::<FileAttachment>()
            .fetch_all(&self.connection_pool)
            .await
    }
}

impl Read<Message, i32> for MessageRepository {
    async fn read(&self, id: &i32) -> Result<Option<Message>, Error> {
        sqlx::query_as::<_, Message>(&format!(
            "SELECT {} FROM messages WHERE message_id = ?",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
