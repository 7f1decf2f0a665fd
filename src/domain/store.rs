//! Room storage contracts.
//!
//! [`RoomStore`] serves reads and hands out [`RoomTransaction`]s. A transaction
//! is the room's exclusive section: while it is alive no other transaction for
//! the same room exists, and nothing it writes is visible until
//! [`RoomTransaction::commit`]. Dropping it without committing discards every
//! staged write and releases the section.
//!
//! These traits are implemented in the infrastructure layer (in-memory and
//! PostgreSQL).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Membership, Message, RoomSearchResult, RoomSnapshot};
use crate::shared::error::RoomError;

/// Read access and lock acquisition for rooms.
#[async_trait]
pub trait RoomStore: Send + Sync + 'static {
    type Transaction: RoomTransaction;

    /// Enter the room's exclusive section.
    ///
    /// Fails with `NotFound` if the room does not exist and with `Busy` if the
    /// section is not acquired within `timeout` (`None` waits indefinitely).
    async fn lock_room(
        &self,
        room_id: i64,
        timeout: Option<Duration>,
    ) -> Result<Self::Transaction, RoomError>;

    /// Committed snapshot of one room.
    async fn find_room(&self, room_id: i64) -> Result<Option<RoomSnapshot>, RoomError>;

    /// Whether `user_id` holds an active membership in `room_id`.
    async fn is_member(&self, room_id: i64, user_id: i64) -> Result<bool, RoomError>;

    /// Rooms the user belongs to, most recently joined first.
    async fn rooms_for_user(&self, user_id: i64) -> Result<Vec<RoomSnapshot>, RoomError>;

    /// Rooms whose name contains `query` (case-insensitive; all rooms when
    /// `None`), ordered by name ascending.
    async fn search_rooms(
        &self,
        query: Option<&str>,
        user_id: i64,
    ) -> Result<Vec<RoomSearchResult>, RoomError>;

    /// A room together with its messages, newest first, read from one
    /// committed state: no listed message is newer than the snapshot.
    async fn room_messages(
        &self,
        room_id: i64,
    ) -> Result<Option<(RoomSnapshot, Vec<Message>)>, RoomError>;
}

/// A locked, staged unit of work over a single room.
///
/// The provided methods are the room state operations; they only touch the
/// locked working copy returned by [`RoomTransaction::snapshot_mut`].
#[async_trait]
pub trait RoomTransaction: Send {
    /// Working copy of the locked room.
    fn snapshot(&self) -> &RoomSnapshot;

    fn snapshot_mut(&mut self) -> &mut RoomSnapshot;

    /// Increment the version by exactly one and stamp `bumped_at`.
    fn bump_version(&mut self, at: DateTime<Utc>) -> i64 {
        self.snapshot_mut().room.bump(at)
    }

    /// Point the room at its newest message.
    fn set_last_message(&mut self, message: &Message, at: DateTime<Utc>) {
        let snapshot = self.snapshot_mut();
        snapshot.room.record_last_message(message.id, at);
        snapshot.last_message = Some(message.clone());
    }

    /// Store the cached member count, clamped at zero.
    fn set_member_count(&mut self, count: i64) -> i64 {
        self.snapshot_mut().room.set_member_count(count)
    }

    async fn find_membership(&mut self, user_id: i64) -> Result<Option<Membership>, RoomError>;

    async fn insert_membership(&mut self, membership: Membership) -> Result<(), RoomError>;

    /// Remove a membership; returns it if it existed.
    async fn delete_membership(&mut self, user_id: i64) -> Result<Option<Membership>, RoomError>;

    /// Active memberships including staged changes.
    async fn count_memberships(&mut self) -> Result<i64, RoomError>;

    async fn append_message(&mut self, message: &Message) -> Result<(), RoomError>;

    /// Publish all staged writes atomically and release the section.
    async fn commit(self) -> Result<RoomSnapshot, RoomError>;
}
