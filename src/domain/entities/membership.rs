//! Room membership entity.
//!
//! Maps to the `room_members` table in the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Records that a user belongs to a room.
///
/// Maps to the `room_members` table:
/// - room_id: BIGINT NOT NULL REFERENCES rooms(id) (composite PK)
/// - user_id: BIGINT NOT NULL REFERENCES users(id) (composite PK)
/// - joined_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub room_id: i64,
    pub user_id: i64,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(room_id: i64, user_id: i64, joined_at: DateTime<Utc>) -> Self {
        Self {
            room_id,
            user_id,
            joined_at,
        }
    }
}
