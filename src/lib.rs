//! Library root - exposes the modules and builds the application router

pub mod cache;
pub mod core;
pub mod dtos;
pub mod entities;
pub mod repositories;
pub mod services;
pub mod ws;

pub use crate::core::{AppError, AppState, Config};

use axum::{
    Router, middleware,
    routing::{any, delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Builds the full application router over the shared state.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(services::health_check))
        .nest("/auth", configure_auth_routes(state.clone()))
        .nest("/users", configure_user_routes(state.clone()))
        .nest("/rooms", configure_room_routes(state.clone()))
        .nest("/messages", configure_message_routes(state.clone()))
        .nest("/files", configure_file_routes(state.clone()))
        .nest("/ws", configure_ws_routes(state.clone()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Login and callback are the only unauthenticated routes besides the
/// health check.
fn configure_auth_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use crate::services::auth;

    Router::new()
        .route("/login", get(auth::login))
        .route("/callback", get(auth::callback))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .layer(middleware::from_fn_with_state(
                    state,
                    authentication_middleware,
                )),
        )
}

fn configure_user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use crate::services::user;

    Router::new()
        .route("/me", get(user::get_me).patch(user::update_username))
        .route("/me/status", patch(user::update_presence))
        .route("/search", get(user::search_users))
        .route("/{user_id}", get(user::get_user_by_id))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_room_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use crate::services::{invitation, room};

    Router::new()
        .route("/", post(room::create_room).get(room::get_rooms))
        .route("/all", get(room::get_rooms_with_last_message))
        .route("/invite", post(invitation::invite))
        .route("/invitations/sent", get(invitation::sent))
        .route("/invitations/received", get(invitation::received))
        .route("/invitations/respond", post(invitation::respond))
        .route("/{room_id}", get(room::get_room).patch(room::update_room))
        .route("/{room_id}/participants", get(room::get_participants))
        .route("/{room_id}/members/{user_id}", delete(room::remove_member))
        .route("/{room_id}/leave", delete(room::leave_room))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_message_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use crate::services::message;

    Router::new()
        .route(
            "/",
            post(message::send_message_handler).put(message::edit_message_handler),
        )
        .route("/room/{room_id}", get(message::get_room_messages_handler))
        .route("/search/{text}", get(message::search_messages_handler))
        .route(
            "/{message_id}",
            get(message::get_message_handler).delete(message::delete_message_handler),
        )
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_file_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use crate::services::storage;

    Router::new()
        .route("/upload", post(storage::upload_file))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_ws_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;

    Router::new()
        .route("/", any(ws::global_ws_handler))
        .route("/chat/{room_id}", any(ws::chat_ws_handler))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
