//! Connection Registry - live outbound channels per user
//!
//! Maps a user id to at most one live channel per plane: the global
//! stream (`/ws`) and the room-chat stream (`/ws/chat/{room_id}`). A user
//! may hold both concurrently, but only one room-chat connection across
//! all rooms; a second connection on the same plane overwrites the first
//! (last writer wins).
//!
//! Delivery through the registry is fire-and-forget: a closed channel is
//! dropped on the next send attempt and never surfaces an error to the
//! caller. Durable delivery guarantees come from the delivery ledger, not
//! from here.

use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

use crate::dtos::{ChatEvent, GlobalEvent};

struct RoomChannel {
    room_id: i32,
    tx: UnboundedSender<ChatEvent>,
}

pub struct ConnectionRegistry {
    global: DashMap<i32, UnboundedSender<GlobalEvent>>,
    room_chat: DashMap<i32, RoomChannel>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        ConnectionRegistry {
            global: DashMap::new(),
            room_chat: DashMap::new(),
        }
    }

    // -------- global plane --------

    #[instrument(skip(self, tx), fields(user_id))]
    pub fn register_global(&self, user_id: i32, tx: UnboundedSender<GlobalEvent>) {
        info!("Registering global connection for user {}", user_id);
        self.global.insert(user_id, tx);
        info!("Total global connections: {}", self.global.len());
    }

    /// Idempotent: removing an absent entry is a no-op.
    #[instrument(skip(self), fields(user_id))]
    pub fn unregister_global(&self, user_id: &i32) {
        self.global.remove(user_id);
    }

    /// Removes the entry only if it still holds `tx`. Used at connection
    /// teardown so a stale connection cannot evict the one that replaced
    /// it.
    pub fn unregister_global_channel(&self, user_id: &i32, tx: &UnboundedSender<GlobalEvent>) {
        self.global
            .remove_if(user_id, |_, current| current.same_channel(tx));
    }

    /// Fire-and-forget delivery; a closed channel is evicted here.
    pub fn send_global(&self, user_id: &i32, event: GlobalEvent) {
        let dead = match self.global.get(user_id) {
            Some(entry) => entry.value().send(event).is_err(),
            None => {
                debug!("User {} has no global connection, event dropped", user_id);
                false
            }
        };
        if dead {
            warn!("Global channel for user {} is closed, removing", user_id);
            self.global.remove(user_id);
        }
    }

    pub fn broadcast_global(&self, user_ids: &[i32], event: &GlobalEvent) {
        for user_id in user_ids {
            self.send_global(user_id, event.clone());
        }
    }

    /// Snapshot of users currently holding a global connection.
    pub fn global_user_ids(&self) -> Vec<i32> {
        self.global.iter().map(|e| *e.key()).collect()
    }

    // -------- room-chat plane --------

    #[instrument(skip(self, tx), fields(user_id, room_id))]
    pub fn register_room(&self, user_id: i32, room_id: i32, tx: UnboundedSender<ChatEvent>) {
        info!("Registering room-chat connection for user {} in room {}", user_id, room_id);
        self.room_chat.insert(user_id, RoomChannel { room_id, tx });
    }

    #[instrument(skip(self), fields(user_id))]
    pub fn unregister_room(&self, user_id: &i32) {
        self.room_chat.remove(user_id);
    }

    /// Channel-aware removal, see [`Self::unregister_global_channel`].
    pub fn unregister_room_channel(&self, user_id: &i32, tx: &UnboundedSender<ChatEvent>) {
        self.room_chat
            .remove_if(user_id, |_, current| current.tx.same_channel(tx));
    }

    pub fn send_room(&self, user_id: &i32, event: ChatEvent) {
        let dead = match self.room_chat.get(user_id) {
            Some(entry) => entry.value().tx.send(event).is_err(),
            None => false,
        };
        if dead {
            warn!("Room-chat channel for user {} is closed, removing", user_id);
            self.room_chat.remove(user_id);
        }
    }

    /// Partial failure of one recipient never blocks the others.
    pub fn broadcast_room(&self, user_ids: &[i32], event: &ChatEvent) {
        for user_id in user_ids {
            self.send_room(user_id, event.clone());
        }
    }

    /// Snapshot of users with a live room-chat connection tagged to this
    /// room, taken before any iteration so a concurrent disconnect cannot
    /// invalidate the broadcast target list.
    pub fn connected_user_ids_in_room(&self, room_id: &i32) -> Vec<i32> {
        self.room_chat
            .iter()
            .filter(|entry| entry.value().room_id == *room_id)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Drops every registered channel. Called once at shutdown; closing
    /// the senders lets the per-connection write tasks run down.
    pub fn drain(&self) {
        info!(
            global = self.global.len(),
            room_chat = self.room_chat.len(),
            "Draining connection registry"
        );
        self.global.clear();
        self.room_chat.clear();
    }

    pub fn global_count(&self) -> usize {
        self.global.len()
    }

    pub fn is_user_online(&self, user_id: &i32) -> bool {
        self.global.contains_key(user_id)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn unregister_of_unknown_user_is_a_noop() {
        let registry = ConnectionRegistry::new();
        registry.unregister_global(&99);
        registry.unregister_room(&99);
        assert_eq!(registry.global_count(), 0);
    }

    #[test]
    fn send_to_unregistered_user_is_a_noop() {
        let registry = ConnectionRegistry::new();
        registry.send_global(&1, GlobalEvent::UserOnline { user_id: 2 });
        registry.send_room(
            &1,
            ChatEvent::MessageDeleted {
                message_id: 1,
                user_id: 2,
            },
        );
    }

    #[test]
    fn duplicate_registration_overwrites_previous_channel() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        registry.register_global(1, tx1);
        registry.register_global(1, tx2);
        assert_eq!(registry.global_count(), 1);

        registry.send_global(&1, GlobalEvent::UserOnline { user_id: 7 });
        assert!(rx2.try_recv().is_ok(), "new channel should receive");
        assert!(rx1.try_recv().is_err(), "old channel should be disconnected");
    }

    #[test]
    fn dead_channel_is_evicted_on_send() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = unbounded_channel();
        registry.register_global(1, tx);
        drop(rx);

        registry.send_global(&1, GlobalEvent::UserOffline { user_id: 1 });
        assert!(!registry.is_user_online(&1));
    }

    #[test]
    fn broadcast_survives_partial_failure() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, rx2) = unbounded_channel();
        let (tx3, mut rx3) = unbounded_channel();
        registry.register_room(1, 10, tx1);
        registry.register_room(2, 10, tx2);
        registry.register_room(3, 10, tx3);
        drop(rx2); // user 2's transport failed

        let targets = registry.connected_user_ids_in_room(&10);
        assert_eq!(targets.len(), 3);
        registry.broadcast_room(
            &targets,
            &ChatEvent::MessageDeleted {
                message_id: 5,
                user_id: 9,
            },
        );

        assert!(rx1.try_recv().is_ok());
        assert!(rx3.try_recv().is_ok());
        // the dead entry was removed without disturbing the others
        assert!(registry.connected_user_ids_in_room(&10).len() == 2);
    }

    #[test]
    fn room_snapshot_is_scoped_to_room() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = unbounded_channel();
        let (tx2, _rx2) = unbounded_channel();
        registry.register_room(1, 10, tx1);
        registry.register_room(2, 11, tx2);

        assert_eq!(registry.connected_user_ids_in_room(&10), vec![1]);
    }

    #[test]
    fn room_reconnect_retargets_user_to_new_room() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = unbounded_channel();
        let (tx2, _rx2) = unbounded_channel();
        registry.register_room(1, 10, tx1);
        registry.register_room(1, 11, tx2);

        assert!(registry.connected_user_ids_in_room(&10).is_empty());
        assert_eq!(registry.connected_user_ids_in_room(&11), vec![1]);
    }

    #[test]
    fn stale_connection_cannot_evict_its_replacement() {
        let registry = ConnectionRegistry::new();
        let (tx_old, _rx_old) = unbounded_channel();
        let (tx_new, _rx_new) = unbounded_channel();
        registry.register_global(1, tx_old.clone());
        registry.register_global(1, tx_new);

        // the first connection's teardown runs after the overwrite
        registry.unregister_global_channel(&1, &tx_old);
        assert!(registry.is_user_online(&1));
    }

    #[test]
    fn drain_empties_both_planes() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = unbounded_channel();
        let (tx2, _rx2) = unbounded_channel();
        registry.register_global(1, tx1);
        registry.register_room(1, 10, tx2);

        registry.drain();
        assert_eq!(registry.global_count(), 0);
        assert!(registry.connected_user_ids_in_room(&10).is_empty());
    }
}
