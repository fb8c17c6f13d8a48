//! Invitation service - invite, list and respond
//!
//! Invitations are the only way into a room besides creating it. Only
//! members invite; only the receiver responds, and only while the
//! invitation is still pending.

use crate::core::{AppError, AppState};
use crate::dtos::{InvitationDTO, Pagination, RespondInvitationDTO, RoomInviteDTO};
use crate::entities::{InvitationState, User};
use crate::repositories::Read;
use crate::services::room::invalidate_room_caches;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::{info, instrument};

/// POST /rooms/invite - member-only.
#[instrument(skip(state, current_user, payload), fields(user_id = %current_user.user_id))]
pub async fn invite(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(payload): Json<RoomInviteDTO>,
) -> Result<(StatusCode, Json<InvitationDTO>), AppError> {
    state
        .room
        .read(&payload.room_id)
        .await?
        .ok_or_else(|| AppError::not_found("Room not found"))?;
    if !state
        .room
        .is_member(&payload.room_id, &current_user.user_id)
        .await?
    {
        return Err(AppError::forbidden("Only room members can invite"));
    }
    state
        .user
        .read(&payload.receiver_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if state
        .room
        .is_member(&payload.room_id, &payload.receiver_id)
        .await?
    {
        return Err(AppError::conflict("User is already a member of this room"));
    }

    let invitation = state
        .invitation
        .create_pending(&payload.room_id, &current_user.user_id, &payload.receiver_id)
        .await?;
    info!(
        "User {} invited user {} to room {}",
        current_user.user_id, payload.receiver_id, payload.room_id
    );
    Ok((
        StatusCode::CREATED,
        Json(InvitationDTO {
            invitation_id: invitation.invitation_id,
            room_id: invitation.room_id,
            sender_id: invitation.sender_id,
            receiver_id: invitation.receiver_id,
            status: InvitationState::Pending,
            created_at: invitation.created_at,
        }),
    ))
}

/// GET /rooms/invitations/sent
pub async fn sent(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<InvitationDTO>>, AppError> {
    let (limit, offset) = pagination.clamped();
    let invitations = state
        .invitation
        .find_sent(&current_user.user_id, limit, offset)
        .await?;
    Ok(Json(invitations))
}

/// GET /rooms/invitations/received
pub async fn received(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<InvitationDTO>>, AppError> {
    let (limit, offset) = pagination.clamped();
    let invitations = state
        .invitation
        .find_received(&current_user.user_id, limit, offset)
        .await?;
    Ok(Json(invitations))
}

/// POST /rooms/invitations/respond - receiver-only, single-shot.
#[instrument(skip(state, current_user, payload), fields(user_id = %current_user.user_id))]
pub async fn respond(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(payload): Json<RespondInvitationDTO>,
) -> Result<Json<InvitationDTO>, AppError> {
    let invitation = state
        .invitation
        .read(&payload.invitation_id)
        .await?
        .ok_or_else(|| AppError::not_found("Invitation not found"))?;
    if invitation.receiver_id != current_user.user_id {
        return Err(AppError::forbidden("Only the invited user can respond"));
    }

    // The repository applies the response only while the status is still
    // pending, so two racing responds cannot both win.
    let status = state
        .invitation
        .respond(&invitation, payload.accept)
        .await?
        .ok_or_else(|| AppError::conflict("Invitation already answered"))?;
    if payload.accept {
        invalidate_room_caches(&state, &invitation.room_id).await?;
        info!(
            "User {} joined room {} via invitation {}",
            current_user.user_id, invitation.room_id, invitation.invitation_id
        );
    }

    Ok(Json(InvitationDTO {
        invitation_id: invitation.invitation_id,
        room_id: invitation.room_id,
        sender_id: invitation.sender_id,
        receiver_id: invitation.receiver_id,
        status,
        created_at: invitation.created_at,
    }))
}
