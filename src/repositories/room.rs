//! RoomRepository - rooms and memberships

use super::Read;
use crate::dtos::CreateRoomDTO;
use crate::entities::{Message, Room, RoomMembership};
use sqlx::{Error, MySqlPool};

const ROOM_COLUMNS: &str = "room_id, name, is_private, created_by, created_at, updated_at";
const MEMBERSHIP_COLUMNS: &str = "membership_id, room_id, user_id, joined_at";

pub struct RoomRepository {
    connection_pool: MySqlPool,
}

impl RoomRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Creates the room and the creator's membership in one transaction.
    pub async fn create_with_creator(
        &self,
        data: &CreateRoomDTO,
        creator_id: &i32,
    ) -> Result<Room, Error> {
        let mut tx = self.connection_pool.begin().await?;

        let result = sqlx::query("INSERT INTO rooms (name, is_private, created_by) VALUES (?, ?, ?)")
            .bind(&data.name)
            .bind(data.is_private)
            .bind(creator_id)
            .execute(&mut *tx)
            .await?;
        let room_id = result.last_insert_id() as i32;

        sqlx::query("INSERT INTO room_memberships (room_id, user_id) VALUES (?, ?)")
            .bind(room_id)
            .bind(creator_id)
            .execute(&mut *tx)
            .await?;

        let room = sqlx::query_as::<_, Room>(&format!(
            "SELECT {} FROM rooms WHERE room_id = ?",
            ROOM_COLUMNS
        ))
        .bind(room_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(room)
    }

    pub async fn update(
        &self,
        room_id: &i32,
        name: Option<&str>,
        is_private: Option<bool>,
    ) -> Result<Room, Error> {
        let mut builder = sqlx::QueryBuilder::new("UPDATE rooms SET updated_at = CURRENT_TIMESTAMP");
        if let Some(name) = name {
            builder.push(", name = ");
            builder.push_bind(name);
        }
        if let Some(is_private) = is_private {
            builder.push(", is_private = ");
            builder.push_bind(is_private);
        }
        builder.push(" WHERE room_id = ");
        builder.push_bind(room_id);
        builder.build().execute(&self.connection_pool).await?;

        sqlx::query_as::<_, Room>(&format!(
            "SELECT {} FROM rooms WHERE room_id = ?",
            ROOM_COLUMNS
        ))
        .bind(room_id)
        .fetch_one(&self.connection_pool)
        .await
    }

    /// All rooms the user belongs to, joined through memberships.
    pub async fn find_many_by_user_id(&self, user_id: &i32) -> Result<Vec<Room>, Error> {
        sqlx::query_as::<_, Room>(
            "SELECT r.room_id, r.name, r.is_private, r.created_by, r.created_at, r.updated_at \
             FROM rooms r \
             JOIN room_memberships m ON m.room_id = r.room_id \
             WHERE m.user_id = ? \
             ORDER BY r.room_id",
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// The most recent message of a room, for listings and the global
    /// stream.
    pub async fn last_message(&self, room_id: &i32) -> Result<Option<Message>, Error> {
        sqlx::query_as::<_, Message>(
            "SELECT message_id, room_id, sender_id, content, created_at, updated_at \
             FROM messages WHERE room_id = ? \
             ORDER BY created_at DESC, message_id DESC LIMIT 1",
        )
        .bind(room_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    pub async fn member_ids(&self, room_id: &i32) -> Result<Vec<i32>, Error> {
        let rows: Vec<(i32,)> =
            sqlx::query_as("SELECT user_id FROM room_memberships WHERE room_id = ?")
                .bind(room_id)
                .fetch_all(&self.connection_pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn is_member(&self, room_id: &i32, user_id: &i32) -> Result<bool, Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM room_memberships WHERE room_id = ? AND user_id = ?",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&self.connection_pool)
        .await?;
        Ok(count.0 > 0)
    }

    pub async fn participants(
        &self,
        room_id: &i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RoomMembership>, Error> {
        sqlx::query_as::<_, RoomMembership>(&format!(
            "SELECT {} FROM room_memberships WHERE room_id = ? \
             ORDER BY joined_at LIMIT ? OFFSET ?",
            MEMBERSHIP_COLUMNS
        ))
        .bind(room_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.connection_pool)
        .await
    }

    pub async fn add_member(&self, room_id: &i32, user_id: &i32) -> Result<(), Error> {
        sqlx::query("INSERT INTO room_memberships (room_id, user_id) VALUES (?, ?)")
            .bind(room_id)
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(())
    }

    /// Idempotent: removing a non-member updates zero rows.
    pub async fn remove_member(&self, room_id: &i32, user_id: &i32) -> Result<(), Error> {
        sqlx::query("DELETE FROM room_memberships WHERE room_id = ? AND user_id = ?")
            .bind(room_id)
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(())
    }
}

impl Read<Room, i32> for RoomRepository {
    async fn read(&self, id: &i32) -> Result<Option<Room>, Error> {
        sqlx::query_as::<_, Room>(&format!(
            "SELECT {} FROM rooms WHERE room_id = ?",
            ROOM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
