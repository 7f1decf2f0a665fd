//! Room entity and its cached aggregate state.
//!
//! Maps to the `rooms` table in the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Message;

/// A named conversation space with cached aggregate state.
///
/// Maps to the `rooms` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - name: VARCHAR(100) NOT NULL
/// - version: BIGINT NOT NULL DEFAULT 0
/// - member_count: BIGINT NOT NULL DEFAULT 0 CHECK (member_count >= 0)
/// - last_message_id: BIGINT NULL REFERENCES messages(id)
/// - created_at / updated_at / bumped_at: TIMESTAMPTZ NOT NULL
///
/// `version`, `member_count` and `last_message_id` are only written while the
/// room's exclusive section is held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room ID (primary key)
    pub id: i64,

    /// Display name
    pub name: String,

    /// Monotonic change counter, +1 per join, leave or post
    pub version: i64,

    /// Cached count of active memberships
    pub member_count: i64,

    /// Most recent message in this room (non-owning)
    pub last_message_id: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Time of the most recent activity
    pub bumped_at: DateTime<Utc>,
}

impl Room {
    /// Create an empty room at version 0.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            version: 0,
            member_count: 0,
            last_message_id: None,
            created_at: now,
            updated_at: now,
            bumped_at: now,
        }
    }

    /// Record activity: advance the version by exactly one.
    pub fn bump(&mut self, at: DateTime<Utc>) -> i64 {
        self.version += 1;
        self.touch(at);
        self.version
    }

    /// Point `last_message_id` at a newly appended message.
    ///
    /// Always overwrites; the caller holds the room lock and has just created
    /// the newest message.
    pub fn record_last_message(&mut self, message_id: i64, at: DateTime<Utc>) {
        self.last_message_id = Some(message_id);
        self.touch(at);
    }

    /// Store a recounted member total, clamped at zero.
    pub fn set_member_count(&mut self, count: i64) -> i64 {
        if count < 0 {
            tracing::warn!(room_id = self.id, count, "Negative member count clamped to zero");
        }
        self.member_count = count.max(0);
        self.member_count
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.bumped_at = at;
        self.updated_at = at;
    }
}

/// Point-in-time view of a room together with its resolved last message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room: Room,
    pub last_message: Option<Message>,
}

impl RoomSnapshot {
    pub fn id(&self) -> i64 {
        self.room.id
    }

    pub fn version(&self) -> i64 {
        self.room.version
    }

    pub fn member_count(&self) -> i64 {
        self.room.member_count
    }
}

/// Search hit: a room plus whether the searching user belongs to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSearchResult {
    pub room: Room,
    pub is_member: bool,
}
