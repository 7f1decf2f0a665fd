//! Message entity.
//!
//! Maps to the `messages` table in the database schema.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// An immutable message posted to a room.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - room_id: BIGINT NOT NULL REFERENCES rooms(id)
/// - user_id: BIGINT NOT NULL REFERENCES users(id)
/// - content: TEXT NOT NULL
/// - sequence: BIGINT NOT NULL (room version assigned by the post)
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Owning room
    pub room_id: i64,

    /// Author
    pub author: User,

    pub content: String,

    /// Room version produced by this post; unique within the room
    pub sequence: i64,

    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Newest-first ordering: `created_at` descending, then `sequence` descending.
    pub fn newest_first(a: &Message, b: &Message) -> Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.sequence.cmp(&a.sequence))
    }
}
