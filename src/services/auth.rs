//! Auth service - OAuth2 authorization-code login flow
//!
//! `/auth/login` bounces the browser to the provider; `/auth/callback`
//! exchanges the returned code, provisions the user row on first login
//! and hands the access token back as a cookie. Everything after that
//! goes through the authentication middleware.

use crate::core::{AppError, AppState};
use crate::dtos::UserDTO;
use crate::repositories::Create;
use crate::repositories::user::CreateUserData;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: String,
}

/// GET /auth/login - redirect to the provider's consent screen.
pub async fn login(State(state): State<Arc<AppState>>) -> Redirect {
    let url = state.auth.authorization_url(&state.config.oauth_redirect_url);
    debug!("Redirecting to identity provider");
    Redirect::temporary(&url)
}

/// GET /auth/callback?code= - completes the flow: code exchange, user
/// provisioning, presence side effect and the access-token cookie.
#[instrument(skip(state, params))]
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let tokens = state
        .auth
        .exchange_code(&params.code, &state.config.oauth_redirect_url)
        .await?;
    let info = state.auth.userinfo(&tokens.access_token).await?;

    let email = info
        .email
        .clone()
        .ok_or_else(|| AppError::unauthorized("Email not present in provider profile"))?;

    let user = match state.user.find_by_email(&email).await? {
        Some(user) => user,
        None => {
            info!("First login for {}, creating user", email);
            provision_user(&state, &email, &info).await?
        }
    };

    // The refresh token is only issued on the first consent; keep the
    // stored one otherwise.
    if let Some(refresh_token) = &tokens.refresh_token {
        state
            .user
            .update_refresh_token(&user.user_id, refresh_token)
            .await?;
    }

    state.presence.mark_active(&user.user_id).await?;
    info!("User {} logged in", user.username);

    let cookie = format!(
        "access_token={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        tokens.access_token, state.config.token_expire_secs
    );
    let mut response =
        (StatusCode::OK, axum::Json(UserDTO::from(user))).into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}

/// Creates the user row from the provider profile. The username starts
/// from the profile name (or the email local part); a collision gets the
/// provider subject appended.
async fn provision_user(
    state: &AppState,
    email: &str,
    info: &crate::core::auth::UserInfo,
) -> Result<crate::entities::User, AppError> {
    let base = info
        .name
        .clone()
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string());
    let base: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.' || *c == '-')
        .take(16)
        .collect();
    let base = if base.is_empty() { "user".to_string() } else { base };

    let mut data = CreateUserData {
        username: base.clone(),
        email: email.to_string(),
        auth_provider: Some("google".to_string()),
        auth_id: Some(info.sub.clone()),
        avatar_url: info.picture.clone(),
    };

    match state.user.create(&data).await {
        Ok(user) => Ok(user),
        Err(e) if is_unique_violation(&e) => {
            warn!("Username {} taken, retrying with subject suffix", base);
            data.username = suffixed_username(&base, &info.sub);
            Ok(state.user.create(&data).await?)
        }
        Err(e) => Err(e.into()),
    }
}

/// Collision fallback, kept inside the 16-char column limit. Counts
/// characters, not bytes, since provider subjects are arbitrary strings.
fn suffixed_username(base: &str, sub: &str) -> String {
    let stem: String = base.chars().take(9).collect();
    let suffix: String = sub.chars().take(6).collect();
    format!("{}_{}", stem, suffix)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// POST /auth/logout - drops the durable presence row to offline and
/// expires the cookie. The provider token itself is not revoked.
#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    axum::Extension(current_user): axum::Extension<crate::entities::User>,
) -> Result<Response, AppError> {
    state.presence.mark_offline(&current_user.user_id).await?;
    state.registry.unregister_global(&current_user.user_id);
    state.registry.unregister_room(&current_user.user_id);

    let mut response = StatusCode::NO_CONTENT.into_response();
    if let Ok(value) =
        HeaderValue::from_str("access_token=deleted; Max-Age=0; Path=/; HttpOnly; SameSite=Lax")
    {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::suffixed_username;

    #[test]
    fn suffixed_username_stays_within_the_column_limit() {
        let name = suffixed_username("a".repeat(16).as_str(), "108205970073005628989");
        assert_eq!(name, "aaaaaaaaa_108205");
        assert!(name.chars().count() <= 16);
    }

    #[test]
    fn suffixed_username_handles_multibyte_subjects() {
        // must not slice mid-character
        let name = suffixed_username("résumé", "ユーザー識別子九文字");
        assert_eq!(name, "résumé_ユーザー識別");
    }

    #[test]
    fn short_subjects_are_used_whole() {
        assert_eq!(suffixed_username("bob", "x1"), "bob_x1");
    }
}
