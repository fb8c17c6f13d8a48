//! Room service - rooms, memberships and the cached listings
//!
//! Listing endpoints that fan out into per-room queries (`/rooms/all`,
//! participants) sit behind the short-TTL cache; every membership or
//! message mutation that would change a listing invalidates the affected
//! keys.

use crate::core::{AppError, AppState};
use crate::dtos::{
    CreateRoomDTO, LastMessageDTO, Pagination, RoomDTO, RoomSummaryDTO, UpdateRoomDTO,
};
use crate::entities::User;
use crate::repositories::Read;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use validator::Validate;

fn room_list_key(user_id: i32) -> String {
    format!("room_list:{}", user_id)
}

fn participants_key(room_id: i32) -> String {
    format!("room_participants:{}", room_id)
}

/// Drops every member's cached room listing after a change that affects
/// it.
pub async fn invalidate_room_caches(state: &AppState, room_id: &i32) -> Result<(), AppError> {
    let member_ids = state.room.member_ids(room_id).await?;
    invalidate_room_caches_for(state, room_id, &member_ids);
    Ok(())
}

/// Same invalidation with the membership list already in hand. Does no
/// database work, so it cannot fail after a commit.
pub fn invalidate_room_caches_for(state: &AppState, room_id: &i32, member_ids: &[i32]) {
    for member_id in member_ids {
        state.cache.delete(&room_list_key(*member_id));
    }
    state.cache.delete(&participants_key(*room_id));
}

/// The user's rooms with each room's most recent message, cache-first.
/// Shared by GET /rooms/all and the global-stream `get_room_list` action.
pub async fn room_summaries(
    state: &AppState,
    user_id: &i32,
) -> Result<Vec<RoomSummaryDTO>, AppError> {
    let key = room_list_key(*user_id);
    if let Some(cached) = state.cache.get_json::<Vec<RoomSummaryDTO>>(&key) {
        debug!("Room list for user {} served from cache", user_id);
        return Ok(cached);
    }

    let rooms = state.room.find_many_by_user_id(user_id).await?;
    let mut summaries = Vec::with_capacity(rooms.len());
    for room in rooms {
        let last_message = state
            .room
            .last_message(&room.room_id)
            .await?
            .as_ref()
            .map(LastMessageDTO::from);
        summaries.push(RoomSummaryDTO {
            id: room.room_id,
            name: room.name,
            last_message,
        });
    }

    state
        .cache
        .set_json(&key, &summaries, state.config.list_cache_ttl_secs);
    Ok(summaries)
}

/// POST /rooms - creates the room with the creator as first member.
#[instrument(skip(state, current_user, payload), fields(user_id = %current_user.user_id))]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(payload): Json<CreateRoomDTO>,
) -> Result<(StatusCode, Json<RoomDTO>), AppError> {
    payload.validate()?;
    let room = state
        .room
        .create_with_creator(&payload, &current_user.user_id)
        .await?;
    state.cache.delete(&room_list_key(current_user.user_id));
    info!("Room {} created by user {}", room.room_id, current_user.user_id);
    Ok((StatusCode::CREATED, Json(RoomDTO::from(room))))
}

/// GET /rooms - plain listing of the user's rooms.
pub async fn get_rooms(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<RoomDTO>>, AppError> {
    let rooms = state.room.find_many_by_user_id(&current_user.user_id).await?;
    Ok(Json(rooms.into_iter().map(RoomDTO::from).collect()))
}

/// GET /rooms/all - listing with each room's last message.
pub async fn get_rooms_with_last_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<RoomSummaryDTO>>, AppError> {
    Ok(Json(room_summaries(&state, &current_user.user_id).await?))
}

/// GET /rooms/{id} - member-only room detail.
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(room_id): Path<i32>,
) -> Result<Json<RoomDTO>, AppError> {
    let room = state
        .room
        .read(&room_id)
        .await?
        .ok_or_else(|| AppError::not_found("Room not found"))?;
    if !state.room.is_member(&room_id, &current_user.user_id).await? {
        return Err(AppError::forbidden("You are not a member of this room"));
    }
    Ok(Json(RoomDTO::from(room)))
}

/// PATCH /rooms/{id} - creator-only settings update.
#[instrument(skip(state, current_user, payload), fields(user_id = %current_user.user_id, room_id))]
pub async fn update_room(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(room_id): Path<i32>,
    Json(payload): Json<UpdateRoomDTO>,
) -> Result<Json<RoomDTO>, AppError> {
    payload.validate()?;
    let room = state
        .room
        .read(&room_id)
        .await?
        .ok_or_else(|| AppError::not_found("Room not found"))?;
    if room.created_by != Some(current_user.user_id) {
        return Err(AppError::forbidden("Only the room creator can update it"));
    }

    let updated = state
        .room
        .update(&room_id, payload.name.as_deref(), payload.is_private)
        .await?;
    invalidate_room_caches(&state, &room_id).await?;
    Ok(Json(RoomDTO::from(updated)))
}

/// GET /rooms/{id}/participants - member-only, paginated, cache-first on
/// the first page.
pub async fn get_participants(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(room_id): Path<i32>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<i32>>, AppError> {
    if !state.room.is_member(&room_id, &current_user.user_id).await? {
        return Err(AppError::forbidden("You are not a member of this room"));
    }

    let (limit, offset) = pagination.clamped();
    let first_page = offset == 0;
    let key = participants_key(room_id);
    if first_page {
        if let Some(cached) = state.cache.get_json::<Vec<i32>>(&key) {
            return Ok(Json(cached));
        }
    }

    let participants = state.room.participants(&room_id, limit, offset).await?;
    let user_ids: Vec<i32> = participants.into_iter().map(|m| m.user_id).collect();
    if first_page {
        state
            .cache
            .set_json(&key, &user_ids, state.config.list_cache_ttl_secs);
    }
    Ok(Json(user_ids))
}

/// DELETE /rooms/{id}/members/{user_id} - creator-only removal.
#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path((room_id, member_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    let room = state
        .room
        .read(&room_id)
        .await?
        .ok_or_else(|| AppError::not_found("Room not found"))?;
    if room.created_by != Some(current_user.user_id) {
        return Err(AppError::forbidden("Only the room creator can remove members"));
    }
    if member_id == current_user.user_id {
        return Err(AppError::bad_request("Use the leave endpoint to leave your own room"));
    }

    state.room.remove_member(&room_id, &member_id).await?;
    invalidate_room_caches(&state, &room_id).await?;
    state.cache.delete(&room_list_key(member_id));
    info!("User {} removed from room {}", member_id, room_id);
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /rooms/{id}/leave - self-removal; idempotent for non-members.
#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, room_id))]
pub async fn leave_room(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(room_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state
        .room
        .read(&room_id)
        .await?
        .ok_or_else(|| AppError::not_found("Room not found"))?;

    state.room.remove_member(&room_id, &current_user.user_id).await?;
    invalidate_room_caches(&state, &room_id).await?;
    state.cache.delete(&room_list_key(current_user.user_id));
    Ok(StatusCode::NO_CONTENT)
}
