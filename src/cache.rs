//! Ephemeral TTL cache
//!
//! In-process key-value store with per-key expiry. Used only as a
//! short-TTL read optimization for list endpoints and as the per-(user,
//! room) staging area for uploaded file URLs awaiting a `send_message`.
//! Never authoritative: the ledger and message content are always read
//! from the database.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct TtlCache {
    entries: DashMap<String, CacheEntry>,
}

impl TtlCache {
    pub fn new() -> Self {
        TtlCache {
            entries: DashMap::new(),
        }
    }

    /// `set-with-expiry`: stores `value` under `key` for `ttl_secs`.
    pub fn set_ex(&self, key: &str, value: String, ttl_secs: u64) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Utc::now() + Duration::seconds(ttl_secs as i64),
            },
        );
    }

    /// Returns the stored value if present and not expired; expired
    /// entries are dropped on access.
    pub fn get(&self, key: &str) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    /// Idempotent removal.
    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Stores any serializable value as JSON.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        match serde_json::to_string(value) {
            Ok(json) => self.set_ex(key, json, ttl_secs),
            Err(e) => warn!("Failed to serialize cache entry for {}: {:?}", key, e),
        }
    }

    /// Reads back a JSON value; an unparsable entry is treated as a miss.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        serde_json::from_str(&raw).ok()
    }

    // -------- staging area for not-yet-attached uploads --------

    fn staging_key(user_id: i32, room_id: i32) -> String {
        format!("staged_files:{}:{}", user_id, room_id)
    }

    /// Appends an uploaded file URL to the (user, room) staging list,
    /// resetting its TTL.
    pub fn stage_file_url(&self, user_id: i32, room_id: i32, url: String, ttl_secs: u64) {
        let key = Self::staging_key(user_id, room_id);
        let mut urls: Vec<String> = self.get_json(&key).unwrap_or_default();
        urls.push(url);
        debug!("Staging area for user {} room {} holds {} files", user_id, room_id, urls.len());
        self.set_json(&key, &urls, ttl_secs);
    }

    pub fn staged_file_urls(&self, user_id: i32, room_id: i32) -> Vec<String> {
        self.get_json(&Self::staging_key(user_id, room_id))
            .unwrap_or_default()
    }

    /// Consumes the staging area after a successful send.
    pub fn clear_staged(&self, user_id: i32, room_id: i32) {
        self.delete(&Self::staging_key(user_id, room_id));
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}
