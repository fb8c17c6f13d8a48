//! Shared test harness: an in-process server over a per-test database
//! plus a mock identity provider. Fixture users authenticate with the
//! bearer token `token-{username}`.

use axum_test::TestServer;
use roomcast::{AppState, Config, create_router};
use sqlx::MySqlPool;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// not every test binary touches every field
#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub provider: MockServer,
}

fn test_config(provider_url: &str) -> Config {
    Config {
        database_url: "mysql://unused".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        max_connections: 5,
        connection_lifetime_secs: 30,
        app_env: "test".to_string(),
        oauth_client_id: "test-client".to_string(),
        oauth_client_secret: "test-secret".to_string(),
        oauth_auth_url: format!("{}/auth", provider_url),
        oauth_token_url: format!("{}/token", provider_url),
        oauth_userinfo_url: format!("{}/userinfo", provider_url),
        oauth_tokeninfo_url: format!("{}/tokeninfo", provider_url),
        oauth_redirect_url: "http://127.0.0.1:0/auth/callback".to_string(),
        token_expire_secs: 3600,
        storage_endpoint: format!("{}/storage", provider_url),
        storage_bucket: "attachments".to_string(),
        list_cache_ttl_secs: 0,
        staging_ttl_secs: 3600,
    }
}

async fn stub_userinfo(provider: &MockServer, username: &str) {
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header(
            "authorization",
            format!("Bearer token-{}", username).as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sub": format!("sub-{}", username),
            "email": format!("{}@example.com", username),
            "name": username,
            "picture": null
        })))
        .mount(provider)
        .await;
}

/// Builds the app over the given pool, with identity stubs for the three
/// fixture users.
pub async fn spawn_app(pool: MySqlPool) -> TestApp {
    let provider = MockServer::start().await;
    for username in ["alice", "bob", "carol"] {
        stub_userinfo(&provider, username).await;
    }

    let state = Arc::new(AppState::new(pool, test_config(&provider.uri())));
    let server = TestServer::new(create_router(state.clone())).unwrap();
    TestApp {
        server,
        state,
        provider,
    }
}

/// Serves the app on an ephemeral TCP port for tests that need a real
/// socket (WebSocket handshakes). Returns the bound address; the mock
/// provider must be kept alive by the caller.
#[allow(dead_code)]
pub async fn spawn_listening_app(pool: MySqlPool) -> (String, Arc<AppState>, MockServer) {
    let provider = MockServer::start().await;
    for username in ["alice", "bob", "carol"] {
        stub_userinfo(&provider, username).await;
    }

    let state = Arc::new(AppState::new(pool, test_config(&provider.uri())));
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr.to_string(), state, provider)
}

#[allow(dead_code)]
pub async fn delivery_state(pool: &MySqlPool, message_id: i32, user_id: i32) -> Option<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT status FROM delivery_status WHERE message_id = ? AND user_id = ?",
    )
    .bind(message_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .unwrap()
}
