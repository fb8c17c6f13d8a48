//! Application State - shared state for all routes and middleware
//!
//! Holds the repositories, the external-service clients and the shared
//! runtime structures (connection registry, TTL cache). Constructed once
//! at startup and handed to the router as `Arc<AppState>`; the registry
//! is drained explicitly at shutdown.

use crate::cache::TtlCache;
use crate::core::{AuthClient, Config};
use crate::repositories::{
    DeliveryRepository, InvitationRepository, MessageRepository, PresenceRepository,
    RoomRepository, UserRepository,
};
use crate::services::storage::ObjectStorage;
use crate::ws::registry::ConnectionRegistry;
use sqlx::MySqlPool;

pub struct AppState {
    /// Repository for user rows and identity linkage
    pub user: UserRepository,

    /// Repository for durable presence state
    pub presence: PresenceRepository,

    /// Repository for rooms and memberships
    pub room: RoomRepository,

    /// Repository for invitations and their status rows
    pub invitation: InvitationRepository,

    /// Repository for messages and attachments
    pub msg: MessageRepository,

    /// Repository for the per-recipient delivery ledger
    pub delivery: DeliveryRepository,

    /// Live outbound channels, one per user per stream plane
    pub registry: ConnectionRegistry,

    /// Ephemeral TTL cache for list endpoints and the upload staging area
    pub cache: TtlCache,

    /// Identity-provider client
    pub auth: AuthClient,

    /// Object-storage client for file attachments
    pub storage: ObjectStorage,

    pub config: Config,
}

impl AppState {
    /// Builds the full state from a connection pool and the loaded
    /// configuration.
    pub fn new(pool: MySqlPool, config: Config) -> Self {
        let auth = AuthClient::new(
            config.oauth_client_id.clone(),
            config.oauth_client_secret.clone(),
            config.oauth_auth_url.clone(),
            config.oauth_token_url.clone(),
            config.oauth_userinfo_url.clone(),
            config.oauth_tokeninfo_url.clone(),
        );
        let storage = ObjectStorage::new(
            config.storage_endpoint.clone(),
            config.storage_bucket.clone(),
        );

        Self {
            user: UserRepository::new(pool.clone()),
            presence: PresenceRepository::new(pool.clone()),
            room: RoomRepository::new(pool.clone()),
            invitation: InvitationRepository::new(pool.clone()),
            msg: MessageRepository::new(pool.clone()),
            delivery: DeliveryRepository::new(pool),
            registry: ConnectionRegistry::new(),
            cache: TtlCache::new(),
            auth,
            storage,
            config,
        }
    }
}
