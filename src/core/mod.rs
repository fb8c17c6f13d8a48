//! Core module - infrastructural components
//!
//! Everything the route handlers lean on:
//! - identity resolution against the external provider
//! - configuration
//! - error handling
//! - shared application state

pub mod auth;
pub mod config;
pub mod error;
pub mod state;

pub use auth::{AuthClient, authentication_middleware};
pub use config::Config;
pub use error::AppError;
pub use state::AppState;
