//! Repositories module - database access per entity
//!
//! Each repository owns a cloned pool handle and exposes the queries one
//! entity needs. Multi-step writes that must be atomic (send, edit,
//! invitation respond) run inside an explicit transaction owned by the
//! repository method, so callers only ever observe committed state.

pub mod delivery;
pub mod invitation;
pub mod message;
pub mod presence;
pub mod room;
pub mod traits;
pub mod user;

pub use traits::{Create, Read};

pub use delivery::DeliveryRepository;
pub use invitation::InvitationRepository;
pub use message::MessageRepository;
pub use presence::PresenceRepository;
pub use room::RoomRepository;
pub use user::UserRepository;
