//! DTOs module - Data Transfer Objects
//!
//! DTOs separate the external representation (API and wire events) from
//! the internal representation (entities). Inbound DTOs carry `validator`
//! rules checked at the boundary before any service logic runs.

pub mod invitation;
pub mod message;
pub mod query;
pub mod room;
pub mod user;
pub mod ws_event;

pub use invitation::{InvitationDTO, RespondInvitationDTO, RoomInviteDTO};
pub use message::{EditMessageDTO, LastMessageDTO, MessageDTO, SendMessageDTO};
pub use query::{MessageSearchQuery, Pagination, UserSearchQuery};
pub use room::{CreateRoomDTO, RoomDTO, RoomSummaryDTO, UpdateRoomDTO};
pub use user::{UpdatePresenceDTO, UpdateUsernameDTO, UserDTO};
pub use ws_event::{ChatAction, ChatEvent, GlobalAction, GlobalEvent};
