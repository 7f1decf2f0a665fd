//! Response DTOs
//!
//! Data structures for API response bodies. IDs are serialized as strings so
//! snowflake values survive JavaScript clients.

use serde::{Deserialize, Serialize};

use crate::application::services::{JoinedRoom, LeftRoom, PostedMessage};
use crate::domain::{Message, Room, RoomSearchResult, RoomSnapshot, User};

/// User response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
        }
    }
}

/// Last message embedded in a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessageResponse {
    pub id: String,
    pub content: String,
    pub user: UserResponse,
    pub created_at: String,
}

impl From<&Message> for LastMessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.to_string(),
            content: message.content.clone(),
            user: UserResponse::from(&message.author),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

/// Room with cached aggregates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomResponse {
    pub id: String,
    pub name: String,
    pub version: i64,
    pub member_count: i64,
    pub last_message: Option<LastMessageResponse>,
}

impl From<&RoomSnapshot> for RoomResponse {
    fn from(snapshot: &RoomSnapshot) -> Self {
        Self {
            id: snapshot.room.id.to_string(),
            name: snapshot.room.name.clone(),
            version: snapshot.room.version,
            member_count: snapshot.room.member_count,
            last_message: snapshot.last_message.as_ref().map(LastMessageResponse::from),
        }
    }
}

/// Search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSearchResponse {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_member: bool,
}

impl From<RoomSearchResult> for RoomSearchResponse {
    fn from(result: RoomSearchResult) -> Self {
        let Room {
            id,
            name,
            created_at,
            updated_at,
            ..
        } = result.room;
        Self {
            id: id.to_string(),
            name,
            created_at: created_at.to_rfc3339(),
            updated_at: updated_at.to_rfc3339(),
            is_member: result.is_member,
        }
    }
}

/// Room reference embedded in a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRoomResponse {
    pub id: String,
    pub version: i64,
}

/// Message response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub content: String,
    pub user: UserResponse,
    pub room: MessageRoomResponse,
    pub created_at: String,
}

impl MessageResponse {
    /// Render a message against the room version the caller observed.
    pub fn new(message: &Message, room_version: i64) -> Self {
        Self {
            id: message.id.to_string(),
            content: message.content.clone(),
            user: UserResponse::from(&message.author),
            room: MessageRoomResponse {
                id: message.room_id.to_string(),
                version: room_version,
            },
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

impl From<&PostedMessage> for MessageResponse {
    fn from(posted: &PostedMessage) -> Self {
        Self::new(&posted.message, posted.room.version())
    }
}

/// Membership response for join/leave
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipResponse {
    pub room: RoomResponse,
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<String>,
}

impl MembershipResponse {
    pub fn joined(joined: &JoinedRoom, user: &User) -> Self {
        Self {
            room: RoomResponse::from(&joined.room),
            user: UserResponse::from(user),
            joined_at: Some(joined.membership.joined_at.to_rfc3339()),
        }
    }

    pub fn left(left: &LeftRoom, user: &User) -> Self {
        Self {
            room: RoomResponse::from(&left.room),
            user: UserResponse::from(user),
            joined_at: None,
        }
    }
}
