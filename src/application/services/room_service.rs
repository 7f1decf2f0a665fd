//! Room Service
//!
//! Membership ledger, message log and read-side queries over rooms.
//! Mutations go through [`RoomCoordinator`]; queries read committed state
//! directly and may trail the latest commit slightly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::coordinator::RoomCoordinator;
use crate::domain::{
    Membership, Message, RoomSearchResult, RoomSnapshot, RoomStore, RoomTransaction, User,
};
use crate::infrastructure::metrics;
use crate::shared::error::RoomError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Room service trait
#[async_trait]
pub trait RoomService: Send + Sync {
    /// Join a room. A redundant join still advances the room version.
    async fn join_room(&self, user_id: i64, room_id: i64) -> Result<JoinedRoom, RoomError>;

    /// Leave a room
    async fn leave_room(&self, user_id: i64, room_id: i64) -> Result<LeftRoom, RoomError>;

    /// Post a message as a member of the room
    async fn post_message(
        &self,
        author: &User,
        room_id: i64,
        content: String,
    ) -> Result<PostedMessage, RoomError>;

    /// Messages of a room, newest first (members only)
    async fn list_messages(&self, user_id: i64, room_id: i64) -> Result<RoomMessages, RoomError>;

    /// Rooms the user belongs to, most recently joined first
    async fn list_rooms_for_user(&self, user_id: i64) -> Result<Vec<RoomSnapshot>, RoomError>;

    /// Rooms matching `query` by name, with the user's membership flag
    async fn search_rooms(
        &self,
        query: Option<&str>,
        user_id: i64,
    ) -> Result<Vec<RoomSearchResult>, RoomError>;

    /// Room detail
    async fn get_room(&self, room_id: i64) -> Result<RoomSnapshot, RoomError>;
}

/// Result of a successful join
#[derive(Debug, Clone)]
pub struct JoinedRoom {
    pub membership: Membership,
    pub room: RoomSnapshot,
}

/// Result of a successful leave
#[derive(Debug, Clone)]
pub struct LeftRoom {
    /// The membership that was removed
    pub membership: Membership,
    pub room: RoomSnapshot,
}

/// Result of a successful post
#[derive(Debug, Clone)]
pub struct PostedMessage {
    pub message: Message,
    pub room: RoomSnapshot,
}

/// Message listing together with the room it was read from
#[derive(Debug, Clone)]
pub struct RoomMessages {
    pub room: RoomSnapshot,
    pub messages: Vec<Message>,
}

enum JoinOutcome {
    Joined(Membership),
    AlreadyMember,
}

/// RoomService implementation
pub struct RoomServiceImpl<S: RoomStore> {
    coordinator: RoomCoordinator<S>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<S: RoomStore> RoomServiceImpl<S> {
    pub fn new(
        store: Arc<S>,
        id_generator: Arc<SnowflakeGenerator>,
        lock_timeout: Option<Duration>,
    ) -> Self {
        Self {
            coordinator: RoomCoordinator::new(store, lock_timeout),
            id_generator,
        }
    }

    fn store(&self) -> &S {
        self.coordinator.store()
    }

    /// `Forbidden` for non-members of an existing room, `NotFound` otherwise.
    async fn require_member(&self, room_id: i64, user_id: i64) -> Result<(), RoomError> {
        if self.store().is_member(room_id, user_id).await? {
            return Ok(());
        }
        if self.store().find_room(room_id).await?.is_none() {
            return Err(RoomError::room_not_found());
        }
        Err(RoomError::Forbidden { room_id, user_id })
    }
}

fn record<T>(operation: &str, result: &Result<T, RoomError>) {
    let outcome = match result {
        Ok(_) => "committed",
        Err(e) => e.kind(),
    };
    metrics::record_mutation(operation, outcome);
}

async fn join_locked<T: RoomTransaction>(
    mut tx: T,
    user_id: i64,
) -> Result<(JoinOutcome, T), RoomError> {
    let now = Utc::now();
    let room_id = tx.snapshot().id();

    // The attempt is recorded even if it turns out to be redundant.
    tx.bump_version(now);

    if tx.find_membership(user_id).await?.is_some() {
        return Ok((JoinOutcome::AlreadyMember, tx));
    }

    let membership = Membership::new(room_id, user_id, now);
    tx.insert_membership(membership.clone()).await?;

    let count = tx.count_memberships().await?;
    tx.set_member_count(count);

    Ok((JoinOutcome::Joined(membership), tx))
}

async fn leave_locked<T: RoomTransaction>(
    mut tx: T,
    user_id: i64,
) -> Result<(Membership, T), RoomError> {
    tx.bump_version(Utc::now());

    // Missing membership aborts the unit, bump included.
    let membership = tx
        .delete_membership(user_id)
        .await?
        .ok_or_else(RoomError::membership_not_found)?;

    let count = tx.count_memberships().await?;
    tx.set_member_count(count);

    Ok((membership, tx))
}

async fn post_locked<T: RoomTransaction>(
    mut tx: T,
    id: i64,
    author: User,
    content: String,
) -> Result<(Message, T), RoomError> {
    let room_id = tx.snapshot().id();

    // Membership may have ended between the pre-check and the lock.
    if tx.find_membership(author.id).await?.is_none() {
        return Err(RoomError::Forbidden {
            room_id,
            user_id: author.id,
        });
    }

    let now = Utc::now();
    let sequence = tx.bump_version(now);

    let message = Message {
        id,
        room_id,
        author,
        content,
        sequence,
        created_at: now,
    };
    tx.append_message(&message).await?;
    tx.set_last_message(&message, message.created_at);

    Ok((message, tx))
}

#[async_trait]
impl<S: RoomStore> RoomService for RoomServiceImpl<S> {
    async fn join_room(&self, user_id: i64, room_id: i64) -> Result<JoinedRoom, RoomError> {
        let result = self
            .coordinator
            .with_room_lock(room_id, "join", move |tx| join_locked(tx, user_id))
            .await
            .and_then(|(outcome, room)| match outcome {
                JoinOutcome::Joined(membership) => Ok(JoinedRoom { membership, room }),
                JoinOutcome::AlreadyMember => Err(RoomError::AlreadyMember { room_id, user_id }),
            });

        record("join", &result);
        if let Ok(joined) = &result {
            tracing::info!(
                room_id,
                user_id,
                version = joined.room.version(),
                member_count = joined.room.member_count(),
                "User joined room"
            );
        }
        result
    }

    async fn leave_room(&self, user_id: i64, room_id: i64) -> Result<LeftRoom, RoomError> {
        let result = self
            .coordinator
            .with_room_lock(room_id, "leave", move |tx| leave_locked(tx, user_id))
            .await
            .map(|(membership, room)| LeftRoom { membership, room });

        record("leave", &result);
        if let Ok(left) = &result {
            tracing::info!(
                room_id,
                user_id,
                version = left.room.version(),
                member_count = left.room.member_count(),
                "User left room"
            );
        }
        result
    }

    async fn post_message(
        &self,
        author: &User,
        room_id: i64,
        content: String,
    ) -> Result<PostedMessage, RoomError> {
        let result = match self.require_member(room_id, author.id).await {
            Ok(()) => {
                let id = self.id_generator.generate();
                let author = author.clone();
                self.coordinator
                    .with_room_lock(room_id, "post", move |tx| {
                        post_locked(tx, id, author, content)
                    })
                    .await
                    .map(|(message, room)| PostedMessage { message, room })
            }
            Err(e) => Err(e),
        };

        record("post", &result);
        if let Ok(posted) = &result {
            tracing::info!(
                room_id,
                user_id = author.id,
                message_id = posted.message.id,
                version = posted.room.version(),
                "Message posted"
            );
        }
        result
    }

    async fn list_messages(&self, user_id: i64, room_id: i64) -> Result<RoomMessages, RoomError> {
        self.require_member(room_id, user_id).await?;

        let (room, messages) = self
            .store()
            .room_messages(room_id)
            .await?
            .ok_or_else(RoomError::room_not_found)?;

        Ok(RoomMessages { room, messages })
    }

    async fn list_rooms_for_user(&self, user_id: i64) -> Result<Vec<RoomSnapshot>, RoomError> {
        self.store().rooms_for_user(user_id).await
    }

    async fn search_rooms(
        &self,
        query: Option<&str>,
        user_id: i64,
    ) -> Result<Vec<RoomSearchResult>, RoomError> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        self.store().search_rooms(query, user_id).await
    }

    async fn get_room(&self, room_id: i64) -> Result<RoomSnapshot, RoomError> {
        self.store()
            .find_room(room_id)
            .await?
            .ok_or_else(RoomError::room_not_found)
    }
}
