//! Room API Tests
//!
//! Join, leave, listing and search over HTTP.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use chat_rooms::application::dto::response::{MembershipResponse, RoomResponse, RoomSearchResponse};

use crate::common::{token_for, TestApp};

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/rooms").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .post(&format!("/api/v1/rooms/{}/join", app.room_id(0)))
        .authorization_bearer("not-a-jwt")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_join_advances_version_and_count() {
    let app = TestApp::new();
    let room_id = app.room_id(0);

    let first: MembershipResponse = app.join(1, room_id).await.json();
    assert_eq!(first.room.version, 1);
    assert_eq!(first.room.member_count, 1);
    assert_eq!(first.user.id, "1");
    assert!(first.joined_at.is_some());

    let second: MembershipResponse = app.join(2, room_id).await.json();
    assert_eq!(second.room.version, 2);
    assert_eq!(second.room.member_count, 2);
}

#[tokio::test]
async fn test_duplicate_join_conflicts_but_still_bumps_version() {
    let app = TestApp::new();
    let room_id = app.room_id(0);

    app.join(1, room_id).await.assert_status_ok();

    let response = app.join(1, room_id).await;
    response.assert_status(StatusCode::CONFLICT);

    let room: RoomResponse = app
        .get_auth(1, &format!("/api/v1/rooms/{room_id}"))
        .await
        .json();
    assert_eq!(room.version, 2);
    assert_eq!(room.member_count, 1);
    assert_eq!(app.store.membership_records(room_id), 1);
}

#[tokio::test]
async fn test_leave_without_membership_is_not_found() {
    let app = TestApp::new();
    let room_id = app.room_id(0);

    app.leave(1, room_id).await.assert_status(StatusCode::NOT_FOUND);

    let room: RoomResponse = app
        .get_auth(1, &format!("/api/v1/rooms/{room_id}"))
        .await
        .json();
    assert_eq!(room.version, 0);
}

#[tokio::test]
async fn test_leave_twice() {
    let app = TestApp::new();
    let room_id = app.room_id(0);

    app.join(1, room_id).await.assert_status_ok();

    let left: MembershipResponse = app.leave(1, room_id).await.json();
    assert_eq!(left.room.version, 2);
    assert_eq!(left.room.member_count, 0);
    assert!(left.joined_at.is_none());

    app.leave(1, room_id).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_room_is_not_found() {
    let app = TestApp::new();

    app.join(1, 9_999).await.assert_status(StatusCode::NOT_FOUND);
    app.get_auth(1, "/api/v1/rooms/9999")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_room_id_is_bad_request() {
    let app = TestApp::new();

    app.get_auth(1, "/api/v1/rooms/abc")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_rooms_only_returns_joined_rooms() {
    let app = TestApp::with_rooms(&["general", "random", "rust"]);

    app.join(1, app.room_id(0)).await.assert_status_ok();
    app.join(1, app.room_id(2)).await.assert_status_ok();
    app.join(2, app.room_id(1)).await.assert_status_ok();

    let rooms: Vec<RoomResponse> = app.get_auth(1, "/api/v1/rooms").await.json();
    let mut names: Vec<&str> = rooms.iter().map(|r| r.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["general", "rust"]);

    let rooms: Vec<RoomResponse> = app.get_auth(3, "/api/v1/rooms").await.json();
    assert!(rooms.is_empty());
}

#[tokio::test]
async fn test_search_flags_membership() {
    let app = TestApp::with_rooms(&["rust-lang", "rustaceans", "python"]);
    app.join(1, app.room_id(0)).await.assert_status_ok();

    let hits: Vec<RoomSearchResponse> = app.get_auth(1, "/api/v1/search?query=RUST").await.json();
    assert_eq!(hits.len(), 2);
    for hit in &hits {
        assert_eq!(hit.is_member, hit.name == "rust-lang");
    }
}

#[tokio::test]
async fn test_search_without_query_lists_all_rooms() {
    let app = TestApp::with_rooms(&["a", "b", "c"]);

    let hits: Vec<Value> = app.get_auth(1, "/api/v1/search").await.json();
    assert_eq!(hits.len(), 3);

    let hits: Vec<Value> = app.get_auth(1, "/api/v1/search?query=%20%20").await.json();
    assert_eq!(hits.len(), 3);
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let app = TestApp::with_rooms(&["100%", "1000"]);

    let hits: Vec<RoomSearchResponse> = app.get_auth(1, "/api/v1/search?query=%25").await.json();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "100%");
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = TestApp::new();
    let now = chrono::Utc::now().timestamp();
    let claims = chat_rooms::presentation::middleware::Claims {
        sub: "1".into(),
        username: "user1".into(),
        exp: now - 3600,
        iat: now - 7200,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(crate::common::TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let response = app.server.get("/api/v1/rooms").authorization_bearer(token).await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    // A fresh token for the same user is accepted.
    app.server
        .get("/api/v1/rooms")
        .authorization_bearer(token_for(1, "user1"))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_long_search_query_returns_empty_list() {
    let app = TestApp::with_rooms(&["general"]);
    let query = "x".repeat(101);

    let response = app
        .get_auth(1, &format!("/api/v1/search?query={query}"))
        .await;

    response.assert_status_ok();
    let hits: Vec<RoomSearchResponse> = response.json();
    assert!(hits.is_empty());
}
