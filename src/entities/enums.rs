//! Enumerations stored as MySQL ENUM columns

use serde::{Deserialize, Serialize};

/// Per-recipient delivery progress of a message.
///
/// `Deleted` is terminal and only ever applies to the owning user's own
/// row; it is one more variant of the same column for schema compatibility,
/// so visibility checks must go through [`DeliveryState::is_visible`]
/// rather than comparing variants directly.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::Type)]
#[sqlx(type_name = "status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Sent,
    Delivered,
    Viewed,
    Failed,
    Deleted,
}

impl DeliveryState {
    /// A requester sees a message in read paths only from these states.
    /// `Sent` is the sender's own row for their own message.
    pub fn is_visible(&self) -> bool {
        matches!(
            self,
            DeliveryState::Sent | DeliveryState::Delivered | DeliveryState::Viewed
        )
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, DeliveryState::Deleted)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::Type)]
#[sqlx(type_name = "status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    Active,
    Offline,
    DoNotDisturb,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::Type)]
#[sqlx(type_name = "status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationState {
    Pending,
    Accepted,
    Rejected,
}
