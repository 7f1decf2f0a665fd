//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

use std::sync::Arc;

use axum_test::{TestResponse, TestServer};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use chat_rooms::config::{
    CorsSettings, DatabaseSettings, JwtSettings, RoomSettings, ServerSettings, Settings,
    SnowflakeSettings, StorageBackend,
};
use chat_rooms::domain::Room;
use chat_rooms::infrastructure::memory::MemoryRoomStore;
use chat_rooms::presentation::middleware::Claims;
use chat_rooms::startup::{build_router, AppState};
use chat_rooms::shared::snowflake::DEFAULT_EPOCH;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-that-is-long-enough";

/// Settings for an in-memory instance
pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseSettings {
            url: String::new(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout: 1,
            run_migrations: false,
        },
        rooms: RoomSettings {
            storage: StorageBackend::Memory,
            lock_timeout_ms: None,
            seed: Vec::new(),
        },
        jwt: JwtSettings {
            secret: TEST_JWT_SECRET.into(),
        },
        snowflake: SnowflakeSettings {
            machine_id: 1,
            epoch: DEFAULT_EPOCH,
        },
        cors: CorsSettings {
            allowed_origins: Vec::new(),
        },
        environment: "test".into(),
    }
}

/// Mint a bearer token for `user_id`
pub fn token_for(user_id: i64, username: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: now + 3600,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Test application over the in-memory store
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub store: Arc<MemoryRoomStore>,
    pub rooms: Vec<Room>,
}

impl TestApp {
    /// Create a test application with the given rooms
    pub fn with_rooms(names: &[&str]) -> Self {
        let store = Arc::new(MemoryRoomStore::new());
        let rooms = names.iter().map(|name| store.create_room(name)).collect();

        let state = AppState::in_memory(test_settings(), store.clone());
        let server = TestServer::new(build_router(state.clone())).unwrap();

        Self {
            server,
            state,
            store,
            rooms,
        }
    }

    /// Create a test application with a single room named `general`
    pub fn new() -> Self {
        Self::with_rooms(&["general"])
    }

    pub fn room_id(&self, index: usize) -> i64 {
        self.rooms[index].id
    }

    pub async fn join(&self, user_id: i64, room_id: i64) -> TestResponse {
        self.server
            .post(&format!("/api/v1/rooms/{room_id}/join"))
            .authorization_bearer(token_for(user_id, &format!("user{user_id}")))
            .await
    }

    pub async fn leave(&self, user_id: i64, room_id: i64) -> TestResponse {
        self.server
            .post(&format!("/api/v1/rooms/{room_id}/leave"))
            .authorization_bearer(token_for(user_id, &format!("user{user_id}")))
            .await
    }

    pub async fn post(&self, user_id: i64, room_id: i64, content: &str) -> TestResponse {
        self.server
            .post(&format!("/api/v1/rooms/{room_id}/messages"))
            .authorization_bearer(token_for(user_id, &format!("user{user_id}")))
            .json(&json!({ "content": content }))
            .await
    }

    pub async fn get_auth(&self, user_id: i64, uri: &str) -> TestResponse {
        self.server
            .get(uri)
            .authorization_bearer(token_for(user_id, &format!("user{user_id}")))
            .await
    }
}
