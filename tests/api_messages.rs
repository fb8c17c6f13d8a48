//! Message lifecycle over HTTP: ledger writes, visibility, viewed /
//! deleted transitions and the edit reset.

mod common;

use common::{delivery_state, spawn_app};
use roomcast::dtos::{GlobalEvent, MessageDTO};
use roomcast::entities::DeliveryState;
use serde_json::json;
use sqlx::MySqlPool;

#[sqlx::test(fixtures("users", "rooms"))]
async fn send_writes_sender_sent_and_recipient_delivered(pool: MySqlPool) {
    let app = spawn_app(pool.clone()).await;

    let response = app
        .server
        .post("/messages")
        .authorization_bearer("token-alice")
        .json(&json!({ "room_id": 10, "content": "first!" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let message: MessageDTO = response.json();
    assert_eq!(message.room_id, 10);
    assert_eq!(message.sender_id, 1);

    let rows = app
        .state
        .delivery
        .statuses_for_message(&message.message_id)
        .await
        .unwrap();
    let states: Vec<(i32, DeliveryState)> =
        rows.into_iter().map(|r| (r.user_id, r.status)).collect();
    // carol is not a member of room 10 at send time, no ledger row
    assert_eq!(
        states,
        vec![(1, DeliveryState::Sent), (2, DeliveryState::Delivered)]
    );
}

#[sqlx::test(fixtures("users", "rooms"))]
async fn send_consumes_the_staged_uploads(pool: MySqlPool) {
    let app = spawn_app(pool.clone()).await;
    app.state
        .cache
        .stage_file_url(1, 10, "https://files/report.pdf".to_string(), 3600);

    let response = app
        .server
        .post("/messages")
        .authorization_bearer("token-alice")
        .json(&json!({ "room_id": 10, "content": "see attachment" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let message: MessageDTO = response.json();
    assert_eq!(message.files, vec!["https://files/report.pdf"]);

    let urls: Vec<String> = sqlx::query_scalar(
        "SELECT file_url FROM file_attachments WHERE message_id = ?",
    )
    .bind(message.message_id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(urls, vec!["https://files/report.pdf"]);

    // the staging area is one-shot
    assert!(app.state.cache.staged_file_urls(1, 10).is_empty());
}

#[sqlx::test(fixtures("users", "rooms"))]
async fn committed_send_survives_a_dead_global_listener(pool: MySqlPool) {
    let app = spawn_app(pool.clone()).await;

    // bob's global stream is registered but its receiver is already gone
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<GlobalEvent>();
    app.state.registry.register_global(2, tx);
    drop(rx);

    let response = app
        .server
        .post("/messages")
        .authorization_bearer("token-alice")
        .json(&json!({ "room_id": 10, "content": "anyone there?" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    // the failed push evicted the channel without touching the commit
    let message: MessageDTO = response.json();
    assert!(!app.state.registry.is_user_online(&2));
    assert_eq!(
        delivery_state(&pool, message.message_id, 2).await.as_deref(),
        Some("delivered")
    );
}

#[sqlx::test(fixtures("users", "rooms"))]
async fn non_member_cannot_send(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    let response = app
        .server
        .post("/messages")
        .authorization_bearer("token-carol")
        .json(&json!({ "room_id": 10, "content": "let me in" }))
        .await;
    response.assert_status_forbidden();
}

#[sqlx::test(fixtures("users", "rooms"))]
async fn empty_content_is_rejected(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    let response = app
        .server
        .post("/messages")
        .authorization_bearer("token-alice")
        .json(&json!({ "room_id": 10, "content": "" }))
        .await;
    response.assert_status_bad_request();
}

#[sqlx::test(fixtures("users", "rooms", "messages"))]
async fn get_marks_requester_row_viewed(pool: MySqlPool) {
    let app = spawn_app(pool.clone()).await;

    let response = app
        .server
        .get("/messages/100")
        .authorization_bearer("token-bob")
        .await;
    response.assert_status_ok();

    let message: MessageDTO = response.json();
    assert_eq!(message.message_id, 100);

    assert_eq!(delivery_state(&pool, 100, 2).await.as_deref(), Some("viewed"));
    // the sender's row is untouched by someone else's read
    assert_eq!(delivery_state(&pool, 100, 1).await.as_deref(), Some("sent"));
}

#[sqlx::test(fixtures("users", "rooms", "messages"))]
async fn repeat_views_stay_viewed(pool: MySqlPool) {
    let app = spawn_app(pool.clone()).await;

    for _ in 0..2 {
        app.server
            .get("/messages/100")
            .authorization_bearer("token-bob")
            .await
            .assert_status_ok();
    }

    // viewing twice never regresses the row to delivered
    assert_eq!(delivery_state(&pool, 100, 2).await.as_deref(), Some("viewed"));
}

#[sqlx::test(fixtures("users", "rooms", "messages"))]
async fn listing_includes_own_sent_messages_and_marks_page_viewed(pool: MySqlPool) {
    let app = spawn_app(pool.clone()).await;

    let response = app
        .server
        .get("/messages/room/10")
        .authorization_bearer("token-alice")
        .await;
    response.assert_status_ok();

    let messages: Vec<MessageDTO> = response.json();
    let ids: Vec<i32> = messages.iter().map(|m| m.message_id).collect();
    assert_eq!(ids, vec![100, 101]);

    assert_eq!(delivery_state(&pool, 100, 1).await.as_deref(), Some("viewed"));
    assert_eq!(delivery_state(&pool, 101, 1).await.as_deref(), Some("viewed"));
    // bob's rows are unaffected
    assert_eq!(delivery_state(&pool, 101, 2).await.as_deref(), Some("sent"));
}

#[sqlx::test(fixtures("users", "rooms", "messages"))]
async fn edit_resets_other_rows_except_deleted(pool: MySqlPool) {
    // carol joins room 10 late and already discarded message 101
    sqlx::query("INSERT INTO room_memberships (room_id, user_id) VALUES (10, 3)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO delivery_status (message_id, user_id, status) VALUES (101, 3, 'deleted')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE delivery_status SET status = 'viewed' WHERE message_id = 101 AND user_id = 1")
        .execute(&pool)
        .await
        .unwrap();

    let app = spawn_app(pool.clone()).await;
    let response = app
        .server
        .put("/messages")
        .authorization_bearer("token-bob")
        .json(&json!({ "message_id": 101, "new_content": "hi alice (edited)" }))
        .await;
    response.assert_status_ok();

    // alice had viewed it, the edit invalidates that
    assert_eq!(delivery_state(&pool, 101, 1).await.as_deref(), Some("delivered"));
    // carol's deleted row is terminal
    assert_eq!(delivery_state(&pool, 101, 3).await.as_deref(), Some("deleted"));
    // the editor's own row is untouched
    assert_eq!(delivery_state(&pool, 101, 2).await.as_deref(), Some("sent"));

    let content: String = sqlx::query_scalar("SELECT content FROM messages WHERE message_id = 101")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(content, "hi alice (edited)");
}

#[sqlx::test(fixtures("users", "rooms", "messages"))]
async fn edit_by_non_sender_is_forbidden(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    let response = app
        .server
        .put("/messages")
        .authorization_bearer("token-alice")
        .json(&json!({ "message_id": 101, "new_content": "hijacked" }))
        .await;
    response.assert_status_forbidden();
}

#[sqlx::test(fixtures("users", "rooms", "messages"))]
async fn edit_replaces_attachments_wholesale(pool: MySqlPool) {
    sqlx::query("INSERT INTO file_attachments (message_id, file_url) VALUES (100, 'https://files/old.png')")
        .execute(&pool)
        .await
        .unwrap();

    let app = spawn_app(pool.clone()).await;
    let response = app
        .server
        .put("/messages")
        .authorization_bearer("token-alice")
        .json(&json!({
            "message_id": 100,
            "file_urls": ["https://files/new-1.png", "https://files/new-2.png"]
        }))
        .await;
    response.assert_status_ok();

    let urls: Vec<String> = sqlx::query_scalar(
        "SELECT file_url FROM file_attachments WHERE message_id = 100 ORDER BY attachment_id",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(urls, vec!["https://files/new-1.png", "https://files/new-2.png"]);
}

#[sqlx::test(fixtures("users", "rooms", "messages"))]
async fn delete_is_own_row_only_and_idempotent(pool: MySqlPool) {
    let app = spawn_app(pool.clone()).await;

    for _ in 0..2 {
        let response = app
            .server
            .delete("/messages/101")
            .authorization_bearer("token-alice")
            .await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
    }

    assert_eq!(delivery_state(&pool, 101, 1).await.as_deref(), Some("deleted"));
    // the sender still sees their message
    assert_eq!(delivery_state(&pool, 101, 2).await.as_deref(), Some("sent"));

    // deleted means gone from every read path for alice
    app.server
        .get("/messages/101")
        .authorization_bearer("token-alice")
        .await
        .assert_status_not_found();

    let listing: Vec<MessageDTO> = app
        .server
        .get("/messages/room/10")
        .authorization_bearer("token-alice")
        .await
        .json();
    assert!(listing.iter().all(|m| m.message_id != 101));

    // but bob's view is untouched
    app.server
        .get("/messages/101")
        .authorization_bearer("token-bob")
        .await
        .assert_status_ok();
}

#[sqlx::test(fixtures("users", "rooms", "messages"))]
async fn viewing_after_delete_does_not_resurrect_the_row(pool: MySqlPool) {
    let app = spawn_app(pool.clone()).await;

    app.server
        .delete("/messages/100")
        .authorization_bearer("token-bob")
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);

    // a room listing bulk-marks the visible page viewed; the deleted row
    // must not be part of it
    app.server
        .get("/messages/room/10")
        .authorization_bearer("token-bob")
        .await
        .assert_status_ok();

    assert_eq!(delivery_state(&pool, 100, 2).await.as_deref(), Some("deleted"));
}

#[sqlx::test(fixtures("users", "rooms", "messages"))]
async fn search_is_scoped_to_requester_visibility(pool: MySqlPool) {
    let app = spawn_app(pool.clone()).await;

    app.server
        .delete("/messages/100")
        .authorization_bearer("token-bob")
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);

    let for_bob: Vec<MessageDTO> = app
        .server
        .get("/messages/search/HELLO")
        .add_query_param("room_id", 10)
        .authorization_bearer("token-bob")
        .await
        .json();
    assert!(for_bob.is_empty());

    // alice still finds it, match is case-insensitive
    let for_alice: Vec<MessageDTO> = app
        .server
        .get("/messages/search/HELLO")
        .add_query_param("room_id", 10)
        .authorization_bearer("token-alice")
        .await
        .json();
    assert_eq!(for_alice.len(), 1);
    assert_eq!(for_alice[0].message_id, 100);
}

#[sqlx::test(fixtures("users", "rooms", "messages"))]
async fn message_in_foreign_room_is_not_found(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    // carol has no ledger row for message 100; invisible and absent look
    // the same
    app.server
        .get("/messages/100")
        .authorization_bearer("token-carol")
        .await
        .assert_status_not_found();
}
