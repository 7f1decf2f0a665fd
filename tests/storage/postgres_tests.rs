//! PostgreSQL Room Store Tests
//!
//! Each test gets a fresh database with migrations applied. They need a
//! running server, so they are ignored by default:
//!
//! ```text
//! DATABASE_URL=postgres://... cargo test -- --ignored
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use pretty_assertions::assert_eq;
use sqlx::PgPool;

use chat_rooms::application::services::{RoomService, RoomServiceImpl};
use chat_rooms::domain::{Membership, RoomStore, RoomTransaction, User};
use chat_rooms::infrastructure::repositories::PgRoomStore;
use chat_rooms::shared::error::RoomError;
use chat_rooms::shared::snowflake::{SnowflakeGenerator, DEFAULT_EPOCH};

async fn create_room(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("INSERT INTO rooms (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn create_user(pool: &PgPool, id: i64, username: &str) -> User {
    sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2)")
        .bind(id)
        .bind(username)
        .execute(pool)
        .await
        .unwrap();
    User::new(id, username)
}

fn service(pool: &PgPool, lock_timeout: Option<Duration>) -> RoomServiceImpl<PgRoomStore> {
    RoomServiceImpl::new(
        Arc::new(PgRoomStore::new(pool.clone())),
        Arc::new(SnowflakeGenerator::new(1, DEFAULT_EPOCH)),
        lock_timeout,
    )
}

async fn version(pool: &PgPool, room_id: i64) -> i64 {
    PgRoomStore::new(pool.clone())
        .find_room(room_id)
        .await
        .unwrap()
        .unwrap()
        .version()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_join_post_leave_scenario(pool: PgPool) {
    let room_id = create_room(&pool, "general").await;
    let alice = create_user(&pool, 1, "alice").await;
    let bob = create_user(&pool, 2, "bob").await;
    let service = service(&pool, None);

    let joined = service.join_room(alice.id, room_id).await.unwrap();
    assert_eq!((joined.room.version(), joined.room.member_count()), (1, 1));
    let joined = service.join_room(bob.id, room_id).await.unwrap();
    assert_eq!((joined.room.version(), joined.room.member_count()), (2, 2));

    let posted = service
        .post_message(&alice, room_id, "hi".into())
        .await
        .unwrap();
    assert_eq!(posted.room.version(), 3);
    assert_eq!(posted.message.sequence, 3);

    let left = service.leave_room(bob.id, room_id).await.unwrap();
    assert_eq!(left.membership.user_id, bob.id);
    assert_eq!((left.room.version(), left.room.member_count()), (4, 1));

    let room = service.get_room(room_id).await.unwrap();
    assert_eq!(room.version(), 4);
    assert_eq!(room.member_count(), 1);
    let last = room.last_message.expect("room has a last message");
    assert_eq!(last.content, "hi");
    assert_eq!(last.author, alice);

    let listed = service.list_messages(alice.id, room_id).await.unwrap();
    assert_eq!(listed.room.version(), 4);
    assert_eq!(listed.messages.len(), 1);
    assert!(matches!(
        service.list_messages(bob.id, room_id).await,
        Err(RoomError::Forbidden { .. })
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_messages_listed_newest_first(pool: PgPool) {
    let room_id = create_room(&pool, "general").await;
    let alice = create_user(&pool, 1, "alice").await;
    let service = service(&pool, None);
    service.join_room(alice.id, room_id).await.unwrap();

    for content in ["one", "two", "three"] {
        service
            .post_message(&alice, room_id, content.into())
            .await
            .unwrap();
    }

    let listed = service.list_messages(alice.id, room_id).await.unwrap();
    let contents: Vec<&str> = listed.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["three", "two", "one"]);
    assert_eq!(
        listed.room.last_message.map(|m| m.content),
        Some("three".to_string())
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_joins_serialize_on_row_lock(pool: PgPool) {
    const USERS: i64 = 16;
    let room_id = create_room(&pool, "busy").await;
    for id in 1..=USERS {
        create_user(&pool, id, &format!("user{id}")).await;
    }
    let service = Arc::new(service(&pool, None));

    let handles = (1..=USERS).map(|user_id| {
        let service = service.clone();
        tokio::spawn(async move { service.join_room(user_id, room_id).await })
    });
    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    let room = service.get_room(room_id).await.unwrap();
    assert_eq!(room.version(), USERS);
    assert_eq!(room.member_count(), USERS);

    let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM room_members WHERE room_id = $1")
        .bind(room_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(records, USERS);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_held_row_lock_reports_busy(pool: PgPool) {
    let room_id = create_room(&pool, "general").await;
    create_user(&pool, 1, "alice").await;

    let mut blocker = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM rooms WHERE id = $1 FOR UPDATE")
        .bind(room_id)
        .execute(&mut *blocker)
        .await
        .unwrap();

    let store = PgRoomStore::new(pool.clone());
    let err = store
        .lock_room(room_id, Some(Duration::from_millis(50)))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, RoomError::Busy { .. }));
    assert!(err.is_retryable());

    let service = service(&pool, Some(Duration::from_millis(50)));
    let err = service.join_room(1, room_id).await.unwrap_err();
    assert!(matches!(err, RoomError::Busy { .. }));

    blocker.rollback().await.unwrap();
    assert_eq!(version(&pool, room_id).await, 0);
    service.join_room(1, room_id).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_lock_wait_after_row_lock_reports_busy(pool: PgPool) {
    let room_id = create_room(&pool, "general").await;
    create_user(&pool, 1, "alice").await;

    // Inserting the membership needs a key-share lock on the user row.
    let mut blocker = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(1_i64)
        .execute(&mut *blocker)
        .await
        .unwrap();

    let service = service(&pool, Some(Duration::from_millis(50)));
    let err = service.join_room(1, room_id).await.unwrap_err();
    assert!(matches!(err, RoomError::Busy { .. }));

    blocker.rollback().await.unwrap();
    assert_eq!(version(&pool, room_id).await, 0);
    assert!(!service.list_rooms_for_user(1).await.unwrap().iter().any(|r| r.id() == room_id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_failed_leave_keeps_version(pool: PgPool) {
    let room_id = create_room(&pool, "general").await;
    create_user(&pool, 1, "alice").await;
    let service = service(&pool, None);

    let err = service.leave_room(1, room_id).await.unwrap_err();
    assert!(matches!(err, RoomError::NotFound("Membership")));
    assert_eq!(version(&pool, room_id).await, 0);

    service.join_room(1, room_id).await.unwrap();
    service.leave_room(1, room_id).await.unwrap();
    let err = service.leave_room(1, room_id).await.unwrap_err();
    assert!(matches!(err, RoomError::NotFound("Membership")));

    let room = service.get_room(room_id).await.unwrap();
    assert_eq!((room.version(), room.member_count()), (2, 0));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_redundant_join_commits_bump(pool: PgPool) {
    let room_id = create_room(&pool, "general").await;
    create_user(&pool, 1, "alice").await;
    let service = service(&pool, None);

    service.join_room(1, room_id).await.unwrap();
    let err = service.join_room(1, room_id).await.unwrap_err();
    assert!(matches!(err, RoomError::AlreadyMember { .. }));

    let room = service.get_room(room_id).await.unwrap();
    assert_eq!((room.version(), room.member_count()), (2, 1));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_dropped_transaction_rolls_back(pool: PgPool) {
    let room_id = create_room(&pool, "general").await;
    create_user(&pool, 1, "alice").await;
    let store = PgRoomStore::new(pool.clone());

    let mut tx = store.lock_room(room_id, None).await.unwrap();
    tx.bump_version(Utc::now());
    tx.insert_membership(Membership::new(room_id, 1, Utc::now()))
        .await
        .unwrap();
    drop(tx);

    assert_eq!(version(&pool, room_id).await, 0);
    assert!(!store.is_member(room_id, 1).await.unwrap());
    assert!(store
        .lock_room(room_id, Some(Duration::from_millis(500)))
        .await
        .is_ok());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_search_matches_wildcards_literally(pool: PgPool) {
    create_room(&pool, "100%").await;
    create_room(&pool, "1000").await;
    let rust = create_room(&pool, "Rustaceans").await;
    create_user(&pool, 1, "alice").await;
    let service = service(&pool, None);
    service.join_room(1, rust).await.unwrap();

    let hits = service.search_rooms(Some("%"), 1).await.unwrap();
    let names: Vec<&str> = hits.iter().map(|h| h.room.name.as_str()).collect();
    assert_eq!(names, vec!["100%"]);

    let hits = service.search_rooms(Some("RUST"), 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].is_member);

    assert_eq!(service.search_rooms(None, 1).await.unwrap().len(), 3);
    assert!(service
        .search_rooms(Some(&"x".repeat(101)), 1)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_rooms_for_user_newest_join_first(pool: PgPool) {
    let first = create_room(&pool, "first").await;
    let second = create_room(&pool, "second").await;
    create_room(&pool, "other").await;
    create_user(&pool, 1, "alice").await;
    let service = service(&pool, None);

    service.join_room(1, first).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    service.join_room(1, second).await.unwrap();

    let rooms = service.list_rooms_for_user(1).await.unwrap();
    let ids: Vec<i64> = rooms.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![second, first]);
}
