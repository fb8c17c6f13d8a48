//! Entities module - domain entities persisted in the database
//!
//! Each entity corresponds to one table. Enums mirror the MySQL ENUM
//! columns they are stored in.

pub mod enums;
pub mod invitation;
pub mod message;
pub mod room;
pub mod user;

pub use enums::{DeliveryState, InvitationState, PresenceState};
pub use invitation::{InvitationStatus, RoomInvitation};
pub use message::{DeliveryStatus, FileAttachment, Message};
pub use room::{Room, RoomMembership};
pub use user::{PresenceStatus, User};
