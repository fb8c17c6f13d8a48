//! Rooms, memberships, invitations and user endpoints over HTTP.

mod common;

use common::spawn_app;
use roomcast::dtos::{InvitationDTO, RoomDTO, RoomSummaryDTO, UserDTO};
use serde_json::json;
use sqlx::MySqlPool;

#[sqlx::test(fixtures("users"))]
async fn create_room_makes_creator_first_member(pool: MySqlPool) {
    let app = spawn_app(pool.clone()).await;

    let response = app
        .server
        .post("/rooms")
        .authorization_bearer("token-alice")
        .json(&json!({ "name": "lounge", "is_private": false }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let room: RoomDTO = response.json();
    assert_eq!(room.created_by, Some(1));

    let is_member: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM room_memberships WHERE room_id = ? AND user_id = 1",
    )
    .bind(room.room_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(is_member, 1);
}

#[sqlx::test(fixtures("users", "rooms"))]
async fn duplicate_room_name_conflicts(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    app.server
        .post("/rooms")
        .authorization_bearer("token-alice")
        .json(&json!({ "name": "general", "is_private": false }))
        .await
        .assert_status(axum::http::StatusCode::CONFLICT);
}

#[sqlx::test(fixtures("users", "rooms", "messages"))]
async fn room_listing_carries_the_last_message(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    let rooms: Vec<RoomSummaryDTO> = app
        .server
        .get("/rooms/all")
        .authorization_bearer("token-alice")
        .await
        .json();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].id, 10);
    let last = rooms[0].last_message.as_ref().expect("room has messages");
    assert_eq!(last.message_id, 101);
}

#[sqlx::test(fixtures("users", "rooms"))]
async fn only_the_creator_updates_a_room(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    app.server
        .patch("/rooms/10")
        .authorization_bearer("token-bob")
        .json(&json!({ "name": "renamed" }))
        .await
        .assert_status_forbidden();

    let response = app
        .server
        .patch("/rooms/10")
        .authorization_bearer("token-alice")
        .json(&json!({ "name": "renamed" }))
        .await;
    response.assert_status_ok();
    let room: RoomDTO = response.json();
    assert_eq!(room.name, "renamed");
}

#[sqlx::test(fixtures("users", "rooms"))]
async fn invite_and_accept_grants_membership(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    // carol cannot see room 10 before the invitation plays out
    app.server
        .get("/rooms/10")
        .authorization_bearer("token-carol")
        .await
        .assert_status_forbidden();

    let response = app
        .server
        .post("/rooms/invite")
        .authorization_bearer("token-bob")
        .json(&json!({ "room_id": 10, "receiver_id": 3 }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let invitation: InvitationDTO = response.json();

    let received: Vec<InvitationDTO> = app
        .server
        .get("/rooms/invitations/received")
        .authorization_bearer("token-carol")
        .await
        .json();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].invitation_id, invitation.invitation_id);

    app.server
        .post("/rooms/invitations/respond")
        .authorization_bearer("token-carol")
        .json(&json!({ "invitation_id": invitation.invitation_id, "accept": true }))
        .await
        .assert_status_ok();

    app.server
        .get("/rooms/10")
        .authorization_bearer("token-carol")
        .await
        .assert_status_ok();
}

#[sqlx::test(fixtures("users", "rooms"))]
async fn only_the_receiver_responds(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    let invitation: InvitationDTO = app
        .server
        .post("/rooms/invite")
        .authorization_bearer("token-bob")
        .json(&json!({ "room_id": 10, "receiver_id": 3 }))
        .await
        .json();

    app.server
        .post("/rooms/invitations/respond")
        .authorization_bearer("token-alice")
        .json(&json!({ "invitation_id": invitation.invitation_id, "accept": true }))
        .await
        .assert_status_forbidden();
}

#[sqlx::test(fixtures("users", "rooms"))]
async fn answered_invitation_cannot_be_answered_again(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    let invitation: InvitationDTO = app
        .server
        .post("/rooms/invite")
        .authorization_bearer("token-bob")
        .json(&json!({ "room_id": 10, "receiver_id": 3 }))
        .await
        .json();

    app.server
        .post("/rooms/invitations/respond")
        .authorization_bearer("token-carol")
        .json(&json!({ "invitation_id": invitation.invitation_id, "accept": false }))
        .await
        .assert_status_ok();

    app.server
        .post("/rooms/invitations/respond")
        .authorization_bearer("token-carol")
        .json(&json!({ "invitation_id": invitation.invitation_id, "accept": true }))
        .await
        .assert_status(axum::http::StatusCode::CONFLICT);
}

#[sqlx::test(fixtures("users", "rooms"))]
async fn racing_accept_after_reject_adds_no_membership(pool: MySqlPool) {
    use roomcast::repositories::Read;

    let app = spawn_app(pool.clone()).await;

    let invitation: InvitationDTO = app
        .server
        .post("/rooms/invite")
        .authorization_bearer("token-bob")
        .json(&json!({ "room_id": 10, "receiver_id": 3 }))
        .await
        .json();

    app.server
        .post("/rooms/invitations/respond")
        .authorization_bearer("token-carol")
        .json(&json!({ "invitation_id": invitation.invitation_id, "accept": false }))
        .await
        .assert_status_ok();

    // a second accept that raced past the service-level checks loses at
    // the pending guard and writes nothing
    let row = app
        .state
        .invitation
        .read(&invitation.invitation_id)
        .await
        .unwrap()
        .expect("invitation exists");
    let won = app.state.invitation.respond(&row, true).await.unwrap();
    assert!(won.is_none());

    let memberships: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM room_memberships WHERE room_id = 10 AND user_id = 3",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(memberships, 0);

    let status: String =
        sqlx::query_scalar("SELECT status FROM invitation_status WHERE invitation_id = ?")
            .bind(invitation.invitation_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "rejected");
}

#[sqlx::test(fixtures("users", "rooms"))]
async fn inviting_an_existing_member_conflicts(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    app.server
        .post("/rooms/invite")
        .authorization_bearer("token-alice")
        .json(&json!({ "room_id": 10, "receiver_id": 2 }))
        .await
        .assert_status(axum::http::StatusCode::CONFLICT);
}

#[sqlx::test(fixtures("users", "rooms"))]
async fn leaving_a_room_revokes_access(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    app.server
        .delete("/rooms/10/leave")
        .authorization_bearer("token-bob")
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);

    app.server
        .get("/rooms/10")
        .authorization_bearer("token-bob")
        .await
        .assert_status_forbidden();
}

#[sqlx::test(fixtures("users"))]
async fn taken_username_is_a_conflict(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    app.server
        .patch("/users/me")
        .authorization_bearer("token-alice")
        .json(&json!({ "username": "bob" }))
        .await
        .assert_status(axum::http::StatusCode::CONFLICT);

    let response = app
        .server
        .patch("/users/me")
        .authorization_bearer("token-alice")
        .json(&json!({ "username": "alice2" }))
        .await;
    response.assert_status_ok();
    let user: UserDTO = response.json();
    assert_eq!(user.username, "alice2");
}

#[sqlx::test(fixtures("users"))]
async fn presence_override_is_persisted(pool: MySqlPool) {
    let app = spawn_app(pool.clone()).await;

    app.server
        .patch("/users/me/status")
        .authorization_bearer("token-alice")
        .json(&json!({ "status": "do_not_disturb" }))
        .await
        .assert_status_ok();

    let status: String = sqlx::query_scalar("SELECT status FROM user_status WHERE user_id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "do_not_disturb");
}

#[sqlx::test(fixtures("users"))]
async fn request_without_token_is_rejected(pool: MySqlPool) {
    let app = spawn_app(pool).await;

    app.server
        .get("/users/me")
        .await
        .assert_status(axum::http::StatusCode::FORBIDDEN);
}
