//! In-memory room store for single-process deployments and tests.
//!
//! Committed state lives in one `RwLock`-guarded set of tables. A
//! [`MemoryRoomTransaction`] holds the room's [`RoomGuard`], works on private
//! copies of the room record and its member set, and publishes them in a
//! single write-locked step on commit. Readers therefore see either all of an
//! operation's writes or none of them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::lock_table::{RoomGuard, RoomLockTable};
use crate::domain::{
    Membership, Message, Room, RoomSearchResult, RoomSnapshot, RoomStore, RoomTransaction,
};
use crate::shared::error::RoomError;

#[derive(Default)]
struct Tables {
    rooms: HashMap<i64, Room>,
    /// room id -> user id -> membership
    members: HashMap<i64, HashMap<i64, Membership>>,
    /// room id -> messages in append order
    messages: HashMap<i64, Vec<Message>>,
}

impl Tables {
    fn snapshot(&self, room: &Room) -> RoomSnapshot {
        let last_message = room.last_message_id.and_then(|id| {
            self.messages
                .get(&room.id)
                .and_then(|log| log.iter().rev().find(|m| m.id == id))
                .cloned()
        });

        RoomSnapshot {
            room: room.clone(),
            last_message,
        }
    }
}

/// In-memory [`RoomStore`].
#[derive(Clone, Default)]
pub struct MemoryRoomStore {
    tables: Arc<RwLock<Tables>>,
    locks: Arc<RoomLockTable>,
    next_room_id: Arc<AtomicI64>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision an empty room.
    pub fn create_room(&self, name: &str) -> Room {
        let id = self.next_room_id.fetch_add(1, Ordering::SeqCst) + 1;
        let room = Room::new(id, name);
        self.tables.write().rooms.insert(id, room.clone());
        tracing::info!(room_id = id, name, "Room created");
        room
    }

    /// Count of stored membership records for a room (ignores the cache).
    pub fn membership_records(&self, room_id: i64) -> usize {
        self.tables
            .read()
            .members
            .get(&room_id)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    type Transaction = MemoryRoomTransaction;

    async fn lock_room(
        &self,
        room_id: i64,
        timeout: Option<Duration>,
    ) -> Result<MemoryRoomTransaction, RoomError> {
        if !self.tables.read().rooms.contains_key(&room_id) {
            return Err(RoomError::room_not_found());
        }

        let guard = self.locks.acquire(room_id, timeout).await?;

        // Re-read under the guard: this copy cannot change until we commit.
        let tables = self.tables.read();
        let room = tables
            .rooms
            .get(&room_id)
            .ok_or_else(RoomError::room_not_found)?;
        let snapshot = tables.snapshot(room);
        let members = tables.members.get(&room_id).cloned().unwrap_or_default();
        drop(tables);

        Ok(MemoryRoomTransaction {
            tables: self.tables.clone(),
            snapshot,
            members,
            appended: Vec::new(),
            _guard: guard,
        })
    }

    async fn find_room(&self, room_id: i64) -> Result<Option<RoomSnapshot>, RoomError> {
        let tables = self.tables.read();
        Ok(tables.rooms.get(&room_id).map(|room| tables.snapshot(room)))
    }

    async fn is_member(&self, room_id: i64, user_id: i64) -> Result<bool, RoomError> {
        Ok(self
            .tables
            .read()
            .members
            .get(&room_id)
            .is_some_and(|m| m.contains_key(&user_id)))
    }

    async fn rooms_for_user(&self, user_id: i64) -> Result<Vec<RoomSnapshot>, RoomError> {
        let tables = self.tables.read();
        let mut joined: Vec<(&Membership, &Room)> = tables
            .members
            .iter()
            .filter_map(|(room_id, members)| {
                let membership = members.get(&user_id)?;
                tables.rooms.get(room_id).map(|room| (membership, room))
            })
            .collect();

        joined.sort_by(|(a, ra), (b, rb)| {
            b.joined_at.cmp(&a.joined_at).then_with(|| ra.id.cmp(&rb.id))
        });

        Ok(joined
            .into_iter()
            .map(|(_, room)| tables.snapshot(room))
            .collect())
    }

    async fn search_rooms(
        &self,
        query: Option<&str>,
        user_id: i64,
    ) -> Result<Vec<RoomSearchResult>, RoomError> {
        let needle = query.map(str::to_lowercase);
        let tables = self.tables.read();

        let mut results: Vec<RoomSearchResult> = tables
            .rooms
            .values()
            .filter(|room| {
                needle
                    .as_deref()
                    .map_or(true, |n| room.name.to_lowercase().contains(n))
            })
            .map(|room| RoomSearchResult {
                room: room.clone(),
                is_member: tables
                    .members
                    .get(&room.id)
                    .is_some_and(|m| m.contains_key(&user_id)),
            })
            .collect();

        results.sort_by(|a, b| {
            a.room
                .name
                .cmp(&b.room.name)
                .then_with(|| a.room.id.cmp(&b.room.id))
        });
        Ok(results)
    }

    async fn room_messages(
        &self,
        room_id: i64,
    ) -> Result<Option<(RoomSnapshot, Vec<Message>)>, RoomError> {
        let tables = self.tables.read();
        let Some(room) = tables.rooms.get(&room_id) else {
            return Ok(None);
        };

        let mut messages = tables.messages.get(&room_id).cloned().unwrap_or_default();
        messages.sort_by(Message::newest_first);
        Ok(Some((tables.snapshot(room), messages)))
    }
}

/// Staged unit of work over one locked room.
pub struct MemoryRoomTransaction {
    tables: Arc<RwLock<Tables>>,
    snapshot: RoomSnapshot,
    members: HashMap<i64, Membership>,
    appended: Vec<Message>,
    _guard: RoomGuard,
}

#[async_trait]
impl RoomTransaction for MemoryRoomTransaction {
    fn snapshot(&self) -> &RoomSnapshot {
        &self.snapshot
    }

    fn snapshot_mut(&mut self) -> &mut RoomSnapshot {
        &mut self.snapshot
    }

    async fn find_membership(&mut self, user_id: i64) -> Result<Option<Membership>, RoomError> {
        Ok(self.members.get(&user_id).cloned())
    }

    async fn insert_membership(&mut self, membership: Membership) -> Result<(), RoomError> {
        if self.members.contains_key(&membership.user_id) {
            return Err(RoomError::AlreadyMember {
                room_id: membership.room_id,
                user_id: membership.user_id,
            });
        }
        self.members.insert(membership.user_id, membership);
        Ok(())
    }

    async fn delete_membership(&mut self, user_id: i64) -> Result<Option<Membership>, RoomError> {
        Ok(self.members.remove(&user_id))
    }

    async fn count_memberships(&mut self) -> Result<i64, RoomError> {
        Ok(self.members.len() as i64)
    }

    async fn append_message(&mut self, message: &Message) -> Result<(), RoomError> {
        self.appended.push(message.clone());
        Ok(())
    }

    async fn commit(self) -> Result<RoomSnapshot, RoomError> {
        let Self {
            tables,
            snapshot,
            members,
            appended,
            _guard,
        } = self;
        let room_id = snapshot.room.id;

        {
            let mut tables = tables.write();
            tables.rooms.insert(room_id, snapshot.room.clone());
            tables.members.insert(room_id, members);
            if !appended.is_empty() {
                tables.messages.entry(room_id).or_default().extend(appended);
            }
        }

        // Published before the section is released.
        drop(_guard);
        Ok(snapshot)
    }
}
