//! WebSocket action dispatch
//!
//! Translates parsed wire actions into lifecycle-service calls and maps
//! failures to `error` events delivered to the caller only. Actions that
//! end in a room broadcast (send, edit, delete) produce no direct reply;
//! the caller receives the broadcast like everyone else.

use crate::core::{AppError, AppState};
use crate::dtos::{ChatAction, ChatEvent, GlobalAction, GlobalEvent};
use crate::entities::User;
use crate::services::{message, room};
use tracing::debug;

fn chat_error(err: AppError) -> ChatEvent {
    ChatEvent::Error {
        code: err.status().as_u16(),
        message: err.message().to_string(),
    }
}

fn global_error(err: AppError) -> GlobalEvent {
    GlobalEvent::Error {
        code: err.status().as_u16(),
        message: err.message().to_string(),
    }
}

pub async fn process_global_action(
    state: &AppState,
    user: &User,
    action: GlobalAction,
) -> GlobalEvent {
    match action {
        GlobalAction::GetRoomList => {
            debug!("User {} requested room list", user.user_id);
            match room::room_summaries(state, &user.user_id).await {
                Ok(summaries) => GlobalEvent::RoomList(summaries),
                Err(err) => global_error(err),
            }
        }
    }
}

/// Dispatches one room-chat action. `None` means the outcome already
/// reached the caller through the room broadcast.
pub async fn process_chat_action(
    state: &AppState,
    user: &User,
    room_id: &i32,
    action: ChatAction,
) -> Option<ChatEvent> {
    match action {
        ChatAction::SendMessage { data } => {
            if data.room_id != *room_id {
                return Some(chat_error(AppError::bad_request(
                    "Message room does not match this stream",
                )));
            }
            match message::send_message(state, &user.user_id, &data).await {
                Ok(_) => None,
                Err(err) => Some(chat_error(err)),
            }
        }
        ChatAction::GetMessages { pagination } => {
            let pagination = pagination.unwrap_or_default();
            match message::list_messages(state, &user.user_id, room_id, &pagination).await {
                Ok(messages) => Some(ChatEvent::MessageHistory(messages)),
                Err(err) => Some(chat_error(err)),
            }
        }
        ChatAction::GetMessage { message_id } => {
            match message::get_message(state, &user.user_id, &message_id).await {
                Ok(dto) => Some(ChatEvent::MessageDetail(dto)),
                Err(err) => Some(chat_error(err)),
            }
        }
        ChatAction::EditMessage { data } => {
            match message::edit_message(state, &user.user_id, &data).await {
                Ok(_) => None,
                Err(err) => Some(chat_error(err)),
            }
        }
        ChatAction::DeleteMessage { message_id } => {
            match message::delete_message(state, &user.user_id, &message_id).await {
                Ok(()) => None,
                Err(err) => Some(chat_error(err)),
            }
        }
    }
}
