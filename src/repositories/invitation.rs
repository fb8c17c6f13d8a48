//! InvitationRepository - room invitations and their 1:1 status rows

use super::Read;
use crate::dtos::InvitationDTO;
use crate::entities::{InvitationState, RoomInvitation};
use sqlx::{Error, MySqlPool};

const INVITATION_COLUMNS: &str = "invitation_id, room_id, sender_id, receiver_id, created_at";

pub struct InvitationRepository {
    connection_pool: MySqlPool,
}

impl InvitationRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Creates the invitation and its `pending` status row atomically.
    pub async fn create_pending(
        &self,
        room_id: &i32,
        sender_id: &i32,
        receiver_id: &i32,
    ) -> Result<RoomInvitation, Error> {
        let mut tx = self.connection_pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO room_invitations (room_id, sender_id, receiver_id) VALUES (?, ?, ?)",
        )
        .bind(room_id)
        .bind(sender_id)
        .bind(receiver_id)
        .execute(&mut *tx)
        .await?;
        let invitation_id = result.last_insert_id() as i32;

        sqlx::query("INSERT INTO invitation_status (invitation_id, status) VALUES (?, 'pending')")
            .bind(invitation_id)
            .execute(&mut *tx)
            .await?;

        let invitation = sqlx::query_as::<_, RoomInvitation>(&format!(
            "SELECT {} FROM room_invitations WHERE invitation_id = ?",
            INVITATION_COLUMNS
        ))
        .bind(invitation_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(invitation)
    }

    pub async fn find_sent(
        &self,
        sender_id: &i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<InvitationDTO>, Error> {
        self.find_joined("i.sender_id", sender_id, limit, offset).await
    }

    pub async fn find_received(
        &self,
        receiver_id: &i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<InvitationDTO>, Error> {
        self.find_joined("i.receiver_id", receiver_id, limit, offset).await
    }

    async fn find_joined(
        &self,
        column: &str,
        user_id: &i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<InvitationDTO>, Error> {
        sqlx::query_as::<_, InvitationDTO>(&format!(
            "SELECT i.invitation_id, i.room_id, i.sender_id, i.receiver_id, s.status, i.created_at \
             FROM room_invitations i \
             JOIN invitation_status s ON s.invitation_id = i.invitation_id \
             WHERE {} = ? \
             ORDER BY i.created_at DESC LIMIT ? OFFSET ?",
            column
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Applies the receiver's response: status update plus, on accept, the
    /// membership row, in one transaction. The `status = 'pending'` guard
    /// makes the response single-shot even under concurrent requests;
    /// `None` means another response got there first.
    pub async fn respond(
        &self,
        invitation: &RoomInvitation,
        accept: bool,
    ) -> Result<Option<InvitationState>, Error> {
        let state = if accept {
            InvitationState::Accepted
        } else {
            InvitationState::Rejected
        };

        let mut tx = self.connection_pool.begin().await?;

        let result = sqlx::query(
            "UPDATE invitation_status SET status = ?, updated_at = CURRENT_TIMESTAMP \
             WHERE invitation_id = ? AND status = 'pending'",
        )
        .bind(&state)
        .bind(invitation.invitation_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        if accept {
            sqlx::query("INSERT INTO room_memberships (room_id, user_id) VALUES (?, ?)")
                .bind(invitation.room_id)
                .bind(invitation.receiver_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Some(state))
    }
}

impl Read<RoomInvitation, i32> for InvitationRepository {
    async fn read(&self, id: &i32) -> Result<Option<RoomInvitation>, Error> {
        sqlx::query_as::<_, RoomInvitation>(&format!(
            "SELECT {} FROM room_invitations WHERE invitation_id = ?",
            INVITATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
