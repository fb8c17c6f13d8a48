//! Broadcast Router - post-commit fan-out to live streams
//!
//! Every function here runs strictly after the database commit it
//! reports on, and is best effort: a recipient without a live channel
//! simply misses the push and catches up through the delivery ledger on
//! the next read.

use crate::core::AppState;
use crate::dtos::{ChatEvent, GlobalEvent, LastMessageDTO};
use crate::entities::Message;
use tracing::debug;

/// Fans a room event out to every user with a live room-chat connection
/// tagged to this room, sender included. The target list is snapshotted
/// before the sends.
pub fn room_event(state: &AppState, room_id: &i32, event: ChatEvent) {
    let targets = state.registry.connected_user_ids_in_room(room_id);
    debug!(
        "Broadcasting to {} connected users in room {}",
        targets.len(),
        room_id
    );
    state.registry.broadcast_room(&targets, &event);
}

/// Pushes a room's new latest message to every member's global stream,
/// so room listings update without polling. Takes the membership list the
/// caller already holds; nothing here can fail after the commit.
pub fn last_message_update(state: &AppState, member_ids: &[i32], message: &Message) {
    let event = GlobalEvent::LastMessageUpdate(LastMessageDTO::from(message));
    state.registry.broadcast_global(member_ids, &event);
}

/// Announces a presence transition to every other globally connected
/// user.
pub fn presence_change(state: &AppState, user_id: &i32, online: bool) {
    let event = if online {
        GlobalEvent::UserOnline { user_id: *user_id }
    } else {
        GlobalEvent::UserOffline { user_id: *user_id }
    };
    let targets: Vec<i32> = state
        .registry
        .global_user_ids()
        .into_iter()
        .filter(|id| id != user_id)
        .collect();
    state.registry.broadcast_global(&targets, &event);
}
