//! Services module - route handlers and the domain logic behind them
//!
//! The message lifecycle lives in `message` and is shared verbatim by the
//! HTTP handlers and the WebSocket action dispatch, so both surfaces get
//! identical semantics.

pub mod auth;
pub mod invitation;
pub mod message;
pub mod room;
pub mod storage;
pub mod user;

use axum::Json;
use serde_json::{Value, json};

/// GET / - liveness probe.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
