//! Identity resolution against the external OAuth2 provider
//!
//! The server never verifies credentials itself: every request carries a
//! bearer token (header or `access_token` cookie) that is resolved to a
//! stable user identity through the provider's `userinfo` endpoint. A
//! rejected access token falls back to `tokeninfo` + the stored refresh
//! token, and the refreshed token is handed back to the client as a
//! cookie on the response.

use crate::core::{AppError, AppState};
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::{body::Body, extract::Request, http, http::Response, middleware::Next};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Profile fields returned by the provider's `userinfo` endpoint.
#[derive(Deserialize, Debug, Clone)]
pub struct UserInfo {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TokenInfo {
    sub: String,
}

/// Token endpoint reply for both the code exchange and the refresh grant.
#[derive(Deserialize, Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Thin reqwest wrapper around the identity provider's endpoints.
pub struct AuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
    tokeninfo_url: String,
}

impl AuthClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        auth_url: String,
        token_url: String,
        userinfo_url: String,
        tokeninfo_url: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            auth_url,
            token_url,
            userinfo_url,
            tokeninfo_url,
        }
    }

    /// URL the login endpoint redirects the browser to.
    pub fn authorization_url(&self, redirect_uri: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope=openid%20email%20profile&access_type=offline",
            self.auth_url, self.client_id, redirect_uri
        )
    }

    #[instrument(skip(self, code))]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AppError> {
        debug!("Exchanging authorization code for tokens");
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                warn!("Authorization code rejected by provider: {:?}", e);
                AppError::unauthorized("Authorization code rejected")
            })?;

        Ok(response.json::<TokenResponse>().await?)
    }

    /// Resolves an access token to the provider profile. Fails with
    /// `Unauthorized` when the provider rejects the token.
    #[instrument(skip(self, access_token))]
    pub async fn userinfo(&self, access_token: &str) -> Result<UserInfo, AppError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()
            .map_err(|_| AppError::unauthorized("Access token rejected"))?;

        Ok(response.json::<UserInfo>().await?)
    }

    /// Recovers the provider subject id from an expired access token.
    #[instrument(skip(self, access_token))]
    pub async fn tokeninfo_subject(&self, access_token: &str) -> Result<String, AppError> {
        let response = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("access_token", access_token)])
            .send()
            .await?
            .error_for_status()
            .map_err(|_| AppError::unauthorized("Access token rejected"))?;

        Ok(response.json::<TokenInfo>().await?.sub)
    }

    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, AppError> {
        debug!("Refreshing access token");
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(|_| AppError::unauthorized("Unable to refresh token"))?;

        Ok(response.json::<TokenResponse>().await?.access_token)
    }
}

/// Extracts the bearer token from the Authorization header or the
/// `access_token` cookie.
fn extract_token(req: &Request) -> Option<String> {
    if let Some(header) = req.headers().get(http::header::AUTHORIZATION) {
        if let Ok(value) = header.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    let cookies = req.headers().get(http::header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "access_token").then(|| value.to_string())
    })
}

/// Outcome of token resolution: the authenticated user plus, when the
/// access token had to be refreshed, the replacement to hand back.
pub struct ResolvedIdentity {
    pub user: crate::entities::User,
    pub refreshed_token: Option<String>,
}

/// Resolves a bearer token to a user row, refreshing through the stored
/// refresh token when the provider rejects it.
#[instrument(skip(state, token))]
pub async fn resolve_token(state: &AppState, token: &str) -> Result<ResolvedIdentity, AppError> {
    match state.auth.userinfo(token).await {
        Ok(info) => {
            let email = info
                .email
                .ok_or_else(|| AppError::unauthorized("Email not present in provider profile"))?;
            let user = state
                .user
                .find_by_email(&email)
                .await?
                .ok_or_else(|| AppError::unauthorized("You are not an authorized user"))?;
            info!("User authenticated: {}", user.username);
            Ok(ResolvedIdentity {
                user,
                refreshed_token: None,
            })
        }
        Err(_) => {
            // Token rejected: recover the subject, then retry with a
            // refreshed token.
            debug!("Access token rejected, attempting refresh");
            let subject = state.auth.tokeninfo_subject(token).await?;
            let user = state
                .user
                .find_by_auth_id(&subject)
                .await?
                .ok_or_else(|| AppError::unauthorized("You are not an authorized user"))?;
            let refresh_token = user.refresh_token.clone().ok_or_else(|| {
                warn!("User {} has no stored refresh token", user.user_id);
                AppError::unauthorized("Session expired, please log in again")
            })?;

            let new_token = state.auth.refresh_access_token(&refresh_token).await?;
            let info = state.auth.userinfo(&new_token).await?;
            let email = info
                .email
                .ok_or_else(|| AppError::unauthorized("Email not present in provider profile"))?;
            let user = state
                .user
                .find_by_email(&email)
                .await?
                .ok_or_else(|| AppError::unauthorized("You are not an authorized user"))?;

            info!("User re-authenticated after token refresh: {}", user.username);
            Ok(ResolvedIdentity {
                user,
                refreshed_token: Some(new_token),
            })
        }
    }
}

/// Authentication middleware for HTTP routes and WebSocket upgrades.
///
/// A WebSocket upgrade that fails here is refused before any message
/// exchange. On a successful refresh the new access token is attached to
/// the response as an `access_token` cookie.
#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let token = extract_token(&req).ok_or_else(|| {
        warn!("Missing bearer token");
        AppError::new(
            StatusCode::FORBIDDEN,
            "Please provide a bearer token or access_token cookie",
        )
    })?;

    let resolved = resolve_token(&state, &token).await?;
    let max_age = state.config.token_expire_secs;
    req.extensions_mut().insert(resolved.user);

    let mut response = next.run(req).await;

    if let Some(new_token) = resolved.refreshed_token {
        let cookie = format!(
            "access_token={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
            new_token, max_age
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(http::header::SET_COOKIE, value);
        }
    }

    Ok(response)
}
