//! Message API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use chat_rooms::application::dto::response::{MessageResponse, RoomResponse};

use crate::common::TestApp;

#[tokio::test]
async fn test_join_post_leave_scenario() {
    let app = TestApp::new();
    let room_id = app.room_id(0);

    app.join(1, room_id).await.assert_status_ok();
    app.join(2, room_id).await.assert_status_ok();

    let response = app.post(1, room_id, "hi").await;
    response.assert_status(StatusCode::CREATED);
    let posted: MessageResponse = response.json();
    assert_eq!(posted.content, "hi");
    assert_eq!(posted.user.id, "1");
    assert_eq!(posted.room.version, 3);

    app.leave(2, room_id).await.assert_status_ok();

    let room: RoomResponse = app
        .get_auth(1, &format!("/api/v1/rooms/{room_id}"))
        .await
        .json();
    assert_eq!(room.version, 4);
    assert_eq!(room.member_count, 1);
    let last = room.last_message.expect("room has a last message");
    assert_eq!(last.content, "hi");
    assert_eq!(last.id, posted.id);
}

#[tokio::test]
async fn test_non_member_cannot_post_or_read() {
    let app = TestApp::new();
    let room_id = app.room_id(0);

    app.post(1, room_id, "hello").await.assert_status(StatusCode::FORBIDDEN);
    app.get_auth(1, &format!("/api/v1/rooms/{room_id}/messages"))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.join(1, room_id).await.assert_status_ok();
    app.post(1, room_id, "hello").await.assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_post_to_unknown_room_is_not_found() {
    let app = TestApp::new();

    app.post(1, 424_242, "hello").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_messages_are_listed_newest_first() {
    let app = TestApp::new();
    let room_id = app.room_id(0);
    app.join(1, room_id).await.assert_status_ok();

    for content in ["one", "two", "three"] {
        app.post(1, room_id, content).await.assert_status(StatusCode::CREATED);
    }

    let messages: Vec<MessageResponse> = app
        .get_auth(1, &format!("/api/v1/rooms/{room_id}/messages"))
        .await
        .json();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["three", "two", "one"]);
}

#[tokio::test]
async fn test_message_content_is_validated() {
    let app = TestApp::new();
    let room_id = app.room_id(0);
    app.join(1, room_id).await.assert_status_ok();

    let response = app.post(1, room_id, "").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], 10007);
    assert_eq!(body["errors"][0]["field"], "content");

    app.post(1, room_id, &"x".repeat(4001))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let room: RoomResponse = app
        .get_auth(1, &format!("/api/v1/rooms/{room_id}"))
        .await
        .json();
    assert_eq!(room.version, 1);
    assert!(room.last_message.is_none());
}
