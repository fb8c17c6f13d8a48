//! User service - profile reads, username changes and user search

use crate::core::{AppError, AppState};
use crate::dtos::{UpdatePresenceDTO, UpdateUsernameDTO, UserDTO, UserSearchQuery};
use crate::entities::User;
use crate::repositories::Read;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

/// GET /users/me - the authenticated user's own profile with presence.
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<UserDTO>, AppError> {
    let status = state
        .presence
        .find_by_user(&current_user.user_id)
        .await?
        .map(|p| p.status);
    Ok(Json(UserDTO::from(current_user).with_status(status)))
}

/// PATCH /users/me - username change; a taken name is a 409 through the
/// unique constraint.
#[instrument(skip(state, current_user, payload), fields(user_id = %current_user.user_id))]
pub async fn update_username(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(payload): Json<UpdateUsernameDTO>,
) -> Result<Json<UserDTO>, AppError> {
    payload.validate()?;
    state
        .user
        .update_username(&current_user.user_id, &payload.username)
        .await
        .map_err(|e| match AppError::from(e) {
            err if err.status() == axum::http::StatusCode::CONFLICT => {
                AppError::conflict("Username already taken")
            }
            err => err,
        })?;
    info!("User {} renamed to {}", current_user.user_id, payload.username);

    let user = state
        .user
        .read(&current_user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(UserDTO::from(user)))
}

/// PATCH /users/me/status - explicit presence override (for
/// `do_not_disturb`; connect/disconnect still drive active/offline).
#[instrument(skip(state, current_user, payload), fields(user_id = %current_user.user_id))]
pub async fn update_presence(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(payload): Json<UpdatePresenceDTO>,
) -> Result<Json<UserDTO>, AppError> {
    state
        .presence
        .set_state(&current_user.user_id, &payload.status)
        .await?;
    Ok(Json(UserDTO::from(current_user).with_status(Some(payload.status))))
}

/// GET /users/search?username=&email= - substring search.
pub async fn search_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserSearchQuery>,
) -> Result<Json<Vec<UserDTO>>, AppError> {
    if params.username.is_none() && params.email.is_none() {
        return Err(AppError::bad_request(
            "Provide at least one of 'username' or 'email'",
        ));
    }
    let users = state
        .user
        .search(params.username.as_deref(), params.email.as_deref())
        .await?;
    Ok(Json(users.into_iter().map(UserDTO::from).collect()))
}

/// GET /users/{id} - public profile with presence.
pub async fn get_user_by_id(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<UserDTO>, AppError> {
    let user = state
        .user
        .read(&user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let status = state.presence.find_by_user(&user_id).await?.map(|p| p.status);
    Ok(Json(UserDTO::from(user).with_status(status)))
}
