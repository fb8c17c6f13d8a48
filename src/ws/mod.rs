//! WebSocket module - upgrade handlers, connection registry, broadcast
//!
//! Two stream planes per user:
//! - `/ws` (global): presence announcements, room-list queries and
//!   last-message pushes
//! - `/ws/chat/{room_id}` (room-chat): the message lifecycle of one room
//!
//! Authentication happens in the HTTP middleware before the upgrade; a
//! rejected token never reaches a socket.

pub mod broadcast;
pub mod connection;
pub mod event_handlers;
pub mod registry;

use crate::core::{AppError, AppState};
use crate::entities::User;
use axum::Extension;
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::Response;
use std::sync::Arc;
use tracing::instrument;

pub use registry::ConnectionRegistry;

/// GET /ws - upgrades to the global stream.
#[instrument(skip(state, ws, current_user), fields(user_id = %current_user.user_id))]
pub async fn global_ws_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| connection::handle_global_socket(state, socket, current_user))
}

/// GET /ws/chat/{room_id} - upgrades to the room-chat stream. Membership
/// is checked before the upgrade, so a non-member is refused at the HTTP
/// layer.
#[instrument(skip(state, ws, current_user), fields(user_id = %current_user.user_id, room_id))]
pub async fn chat_ws_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(room_id): Path<i32>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    if !state.room.is_member(&room_id, &current_user.user_id).await? {
        return Err(AppError::forbidden("You are not a member of this room"));
    }
    Ok(ws.on_upgrade(move |socket| {
        connection::handle_chat_socket(state, socket, current_user, room_id)
    }))
}
