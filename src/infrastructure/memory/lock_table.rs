//! Per-room lock table.
//!
//! One async mutex per room id, created on first use and evicted once no
//! holder or waiter references it. Holding a [`RoomGuard`] is holding the
//! room's exclusive section; dropping it releases the section on every exit
//! path, including future cancellation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::shared::error::RoomError;

type LockMap = DashMap<i64, Arc<Mutex<()>>>;

/// Exclusive section for one room.
#[derive(Debug)]
pub struct RoomGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
    room_id: i64,
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        // Release first so the entry's only remaining reference is the map's.
        drop(self.guard.take());
        evict_idle(&self.locks, self.room_id);
    }
}

/// Remove the room's mutex if nobody holds or awaits it.
///
/// Acquirers clone the `Arc` under the same shard lock `remove_if` takes, so
/// a count of one cannot race with a new acquisition.
fn evict_idle(locks: &LockMap, room_id: i64) {
    locks.remove_if(&room_id, |_, lock| Arc::strong_count(lock) == 1);
}

/// Sharded table of room mutexes.
///
/// Rooms never share a mutex, so unrelated rooms never wait on each other.
#[derive(Default)]
pub struct RoomLockTable {
    locks: Arc<LockMap>,
}

impl RoomLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the room's section, giving up with `Busy` after `timeout`.
    pub async fn acquire(
        &self,
        room_id: i64,
        timeout: Option<Duration>,
    ) -> Result<RoomGuard, RoomError> {
        // Clone the Arc out so the shard lock is not held across the await.
        let lock = self
            .locks
            .entry(room_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let started = Instant::now();
        let guard = match timeout {
            None => lock.lock_owned().await,
            Some(limit) => match tokio::time::timeout(limit, lock.lock_owned()).await {
                Ok(guard) => guard,
                Err(_) => {
                    evict_idle(&self.locks, room_id);
                    return Err(RoomError::Busy {
                        room_id,
                        waited_ms: started.elapsed().as_millis() as u64,
                    });
                }
            },
        };

        Ok(RoomGuard {
            guard: Some(guard),
            locks: self.locks.clone(),
            room_id,
        })
    }

    /// Number of rooms currently held or awaited.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
