//! Message Lifecycle Service
//!
//! The single implementation of send / get / list / edit / delete /
//! search, shared by the HTTP handlers below and by the WebSocket action
//! dispatch. Order of operations is fixed everywhere: validate, commit to
//! the database, then broadcast. A broadcast can never precede its
//! commit, and a failed broadcast never rolls anything back.

use crate::core::{AppError, AppState};
use crate::dtos::{
    ChatEvent, EditMessageDTO, MessageDTO, MessageSearchQuery, Pagination, SendMessageDTO,
};
use crate::entities::{DeliveryState, Message, User};
use crate::repositories::Read;
use crate::services::room::invalidate_room_caches_for;
use crate::ws::broadcast;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

/// Send: membership check, atomic message + ledger + attachments commit,
/// then the room broadcast and the global last-message push.
///
/// The staged uploads for this (user, room) pair are consumed as the
/// message's attachments and the staging area is cleared only after the
/// commit succeeds.
#[instrument(skip(state, payload), fields(sender_id, room_id = payload.room_id))]
pub async fn send_message(
    state: &AppState,
    sender_id: &i32,
    payload: &SendMessageDTO,
) -> Result<MessageDTO, AppError> {
    payload.validate()?;
    state
        .room
        .read(&payload.room_id)
        .await?
        .ok_or_else(|| AppError::not_found("Room not found"))?;
    if !state.room.is_member(&payload.room_id, sender_id).await? {
        return Err(AppError::forbidden("Only room members can send messages"));
    }

    let member_ids = state.room.member_ids(&payload.room_id).await?;
    let staged = state.cache.staged_file_urls(*sender_id, payload.room_id);

    let message = state
        .msg
        .create_with_ledger(&payload.room_id, sender_id, &payload.content, &member_ids, &staged)
        .await?;
    state.cache.clear_staged(*sender_id, payload.room_id);
    info!("Message {} committed in room {}", message.message_id, message.room_id);

    let mut dto = MessageDTO::from(message.clone());
    dto.files = staged;

    // Post-commit work reuses the membership list fetched above and
    // does no database work.
    broadcast::room_event(state, &message.room_id, ChatEvent::NewMessage(dto.clone()));
    broadcast::last_message_update(state, &member_ids, &message);
    invalidate_room_caches_for(state, &message.room_id, &member_ids);

    Ok(dto.with_status(DeliveryState::Sent))
}

/// Get: returns the message only if the requester's own ledger row makes
/// it visible, and flips that row to `viewed` as a side effect.
pub async fn get_message(
    state: &AppState,
    user_id: &i32,
    message_id: &i32,
) -> Result<MessageDTO, AppError> {
    let message = state
        .msg
        .find_visible_by_id(message_id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))?;

    state.delivery.mark_viewed(message_id, user_id).await?;
    let files = state.msg.attachments(message_id).await?;
    Ok(MessageDTO::from_message(message, files).with_status(DeliveryState::Viewed))
}

/// List: the requester-visible page of a room's history, bulk-marked
/// `viewed` on return.
pub async fn list_messages(
    state: &AppState,
    user_id: &i32,
    room_id: &i32,
    pagination: &Pagination,
) -> Result<Vec<MessageDTO>, AppError> {
    state
        .room
        .read(room_id)
        .await?
        .ok_or_else(|| AppError::not_found("Room not found"))?;
    if !state.room.is_member(room_id, user_id).await? {
        return Err(AppError::forbidden("You are not a member of this room"));
    }

    let (limit, offset) = pagination.clamped();
    let messages = state
        .msg
        .find_visible_by_room(room_id, user_id, limit, offset)
        .await?;

    let ids: Vec<i32> = messages.iter().map(|m| m.message_id).collect();
    state.delivery.mark_viewed_many(&ids, user_id).await?;

    let mut files_by_message = group_attachments(state, &ids).await?;
    Ok(messages
        .into_iter()
        .map(|m| {
            let files = files_by_message.remove(&m.message_id).unwrap_or_default();
            let mut dto = MessageDTO::from(m);
            dto.files = files;
            dto.with_status(DeliveryState::Viewed)
        })
        .collect())
}

/// Edit: sender-only. Commits the new content, the wholesale attachment
/// replacement and the ledger reset of every other non-deleted row, then
/// broadcasts.
#[instrument(skip(state, payload), fields(user_id, message_id = payload.message_id))]
pub async fn edit_message(
    state: &AppState,
    user_id: &i32,
    payload: &EditMessageDTO,
) -> Result<MessageDTO, AppError> {
    payload.validate()?;
    let message = state
        .msg
        .read(&payload.message_id)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))?;
    if message.sender_id != *user_id {
        return Err(AppError::forbidden("Only the sender can edit a message"));
    }

    let updated = state
        .msg
        .update_with_reset(
            &payload.message_id,
            payload.new_content.as_deref(),
            &payload.file_urls,
            user_id,
        )
        .await?;
    info!("Message {} edited", updated.message_id);

    let mut dto = MessageDTO::from(updated.clone());
    dto.files = payload.file_urls.clone();
    broadcast::room_event(state, &updated.room_id, ChatEvent::MessageEdited(dto.clone()));

    // The edit already committed; refreshing the listings is best effort.
    if let Err(e) = refresh_listings_if_latest(state, &updated).await {
        warn!(
            "Listing refresh skipped after editing message {}: {}",
            updated.message_id,
            e.message()
        );
    }

    Ok(dto.with_status(DeliveryState::Sent))
}

/// Delete: soft-deletes the requester's own ledger row. Terminal for that
/// user, invisible to everyone else's ledger, idempotent on repeat.
#[instrument(skip(state), fields(user_id, message_id))]
pub async fn delete_message(
    state: &AppState,
    user_id: &i32,
    message_id: &i32,
) -> Result<(), AppError> {
    let message = state
        .msg
        .read(message_id)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))?;

    state.delivery.mark_deleted(message_id, user_id).await?;
    info!("Message {} deleted for user {}", message_id, user_id);

    broadcast::room_event(
        state,
        &message.room_id,
        ChatEvent::MessageDeleted {
            message_id: *message_id,
            user_id: *user_id,
        },
    );
    Ok(())
}

/// Search: case-insensitive substring match over the requester-visible
/// slice of a room. Read-only, no `viewed` side effect, no `status` in
/// the result.
pub async fn search_messages(
    state: &AppState,
    user_id: &i32,
    room_id: &i32,
    text: &str,
) -> Result<Vec<MessageDTO>, AppError> {
    state
        .room
        .read(room_id)
        .await?
        .ok_or_else(|| AppError::not_found("Room not found"))?;
    if !state.room.is_member(room_id, user_id).await? {
        return Err(AppError::forbidden("You are not a member of this room"));
    }

    let messages = state.msg.search_visible(room_id, user_id, text).await?;
    let ids: Vec<i32> = messages.iter().map(|m| m.message_id).collect();
    let mut files_by_message = group_attachments(state, &ids).await?;
    Ok(messages
        .into_iter()
        .map(|m| {
            let files = files_by_message.remove(&m.message_id).unwrap_or_default();
            let mut dto = MessageDTO::from(m);
            dto.files = files;
            dto
        })
        .collect())
}

/// An edit of the room's latest message changes the listings too.
async fn refresh_listings_if_latest(state: &AppState, message: &Message) -> Result<(), AppError> {
    let is_latest = state
        .room
        .last_message(&message.room_id)
        .await?
        .is_some_and(|last| last.message_id == message.message_id);
    if is_latest {
        let member_ids = state.room.member_ids(&message.room_id).await?;
        broadcast::last_message_update(state, &member_ids, message);
        invalidate_room_caches_for(state, &message.room_id, &member_ids);
    }
    Ok(())
}

async fn group_attachments(
    state: &AppState,
    message_ids: &[i32],
) -> Result<HashMap<i32, Vec<String>>, AppError> {
    let mut grouped: HashMap<i32, Vec<String>> = HashMap::new();
    for attachment in state.msg.attachments_for_messages(message_ids).await? {
        grouped
            .entry(attachment.message_id)
            .or_default()
            .push(attachment.file_url);
    }
    Ok(grouped)
}

// ---- HTTP surface ----

/// POST /messages
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(payload): Json<SendMessageDTO>,
) -> Result<(StatusCode, Json<MessageDTO>), AppError> {
    let dto = send_message(&state, &current_user.user_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

/// GET /messages/{id}
pub async fn get_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
) -> Result<Json<MessageDTO>, AppError> {
    Ok(Json(get_message(&state, &current_user.user_id, &message_id).await?))
}

/// GET /messages/room/{room_id}?limit=&offset=
pub async fn get_room_messages_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(room_id): Path<i32>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<MessageDTO>>, AppError> {
    Ok(Json(
        list_messages(&state, &current_user.user_id, &room_id, &pagination).await?,
    ))
}

/// GET /messages/search/{text}?room_id=
pub async fn search_messages_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(text): Path<String>,
    Query(params): Query<MessageSearchQuery>,
) -> Result<Json<Vec<MessageDTO>>, AppError> {
    Ok(Json(
        search_messages(&state, &current_user.user_id, &params.room_id, &text).await?,
    ))
}

/// PUT /messages
pub async fn edit_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(payload): Json<EditMessageDTO>,
) -> Result<Json<MessageDTO>, AppError> {
    Ok(Json(edit_message(&state, &current_user.user_id, &payload).await?))
}

/// DELETE /messages/{id}
pub async fn delete_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    delete_message(&state, &current_user.user_id, &message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
