//! WebSocket connection loops
//!
//! One pair of tasks per socket: a spawned write task drains the user's
//! registry channel into the socket, while the read loop parses inbound
//! actions and processes them strictly in arrival order. All per-user
//! side effects of connect/disconnect (registry entry, durable presence,
//! presence announcements) happen here and only here.

use crate::core::AppState;
use crate::dtos::{ChatAction, ChatEvent, GlobalAction, GlobalEvent};
use crate::entities::User;
use crate::ws::{broadcast, event_handlers};
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::{debug, info, instrument, warn};

/// Forwards registry events to the socket until either side closes.
async fn write_events<E: Serialize>(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut rx: UnboundedReceiver<E>,
) {
    while let Some(event) = rx.recv().await {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize outbound event: {:?}", e);
                continue;
            }
        };
        if ws_tx.send(Message::Text(Utf8Bytes::from(json))).await.is_err() {
            debug!("Socket closed while writing, stopping write task");
            break;
        }
    }
}

/// Global stream (`/ws`): presence side effects plus the room-list /
/// last-message event feed.
#[instrument(skip(state, ws, user), fields(user_id = %user.user_id))]
pub async fn handle_global_socket(state: Arc<AppState>, ws: WebSocket, user: User) {
    info!("Global stream connected");

    let (ws_tx, mut ws_rx) = ws.split();
    let (tx, rx) = unbounded_channel::<GlobalEvent>();

    state.registry.register_global(user.user_id, tx.clone());
    if let Err(e) = state.presence.mark_active(&user.user_id).await {
        warn!("Failed to mark user active: {:?}", e);
    }
    broadcast::presence_change(&state, &user.user_id, true);

    let write_task = tokio::spawn(write_events(ws_tx, rx));

    // Actions are processed inline so a client's actions keep their order.
    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Text(text) => {
                let event = match serde_json::from_str::<GlobalAction>(&text) {
                    Ok(action) => {
                        event_handlers::process_global_action(&state, &user, action).await
                    }
                    Err(_) => GlobalEvent::Error {
                        code: 400,
                        message: "Malformed action".to_string(),
                    },
                };
                state.registry.send_global(&user.user_id, event);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Teardown order: registry first so no new events target this
    // channel, then the durable presence write, then the announcement.
    state.registry.unregister_global_channel(&user.user_id, &tx);
    if !state.registry.is_user_online(&user.user_id) {
        if let Err(e) = state.presence.mark_offline(&user.user_id).await {
            warn!("Failed to mark user offline: {:?}", e);
        }
        broadcast::presence_change(&state, &user.user_id, false);
    }
    write_task.abort();
    info!("Global stream disconnected");
}

/// Room-chat stream (`/ws/chat/{room_id}`): the message lifecycle feed
/// for exactly one room. No presence side effects on this plane.
#[instrument(skip(state, ws, user), fields(user_id = %user.user_id, room_id))]
pub async fn handle_chat_socket(state: Arc<AppState>, ws: WebSocket, user: User, room_id: i32) {
    info!("Room-chat stream connected");

    let (ws_tx, mut ws_rx) = ws.split();
    let (tx, rx) = unbounded_channel::<ChatEvent>();

    state.registry.register_room(user.user_id, room_id, tx.clone());

    let write_task = tokio::spawn(write_events(ws_tx, rx));

    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Text(text) => {
                let reply = match serde_json::from_str::<ChatAction>(&text) {
                    Ok(action) => {
                        event_handlers::process_chat_action(&state, &user, &room_id, action).await
                    }
                    Err(_) => Some(ChatEvent::Error {
                        code: 400,
                        message: "Malformed action".to_string(),
                    }),
                };
                if let Some(event) = reply {
                    state.registry.send_room(&user.user_id, event);
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.registry.unregister_room_channel(&user.user_id, &tx);
    write_task.abort();
    info!("Room-chat stream disconnected");
}
