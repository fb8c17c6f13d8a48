//! Query DTOs for pagination and search parameters

use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Pagination {
    #[serde(default = "Pagination::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Pagination {
    fn default_limit() -> i64 {
        DEFAULT_LIMIT
    }

    /// Clamps the limit into `1..=100` and the offset to non-negative,
    /// whatever the client sent.
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_LIMIT), self.offset.max(0))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserSearchQuery {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MessageSearchQuery {
    pub room_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_apply_on_empty_json() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.limit, 20);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn pagination_clamps_out_of_range_values() {
        let p = Pagination {
            limit: 5000,
            offset: -3,
        };
        assert_eq!(p.clamped(), (100, 0));
    }
}
