//! Room Coordinator
//!
//! Serializes mutations of a single room. Every join, leave and post runs
//! inside [`RoomCoordinator::with_room_lock`]: the room's exclusive section is
//! entered, the operation stages its writes on the locked transaction, and the
//! transaction is committed only if the operation returns `Ok`. Any error, or
//! dropping the future mid-way, rolls the whole unit back and releases the
//! section.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::{RoomSnapshot, RoomStore, RoomTransaction};
use crate::infrastructure::metrics;
use crate::shared::error::RoomError;

/// Runs room mutations under the room's exclusive section.
pub struct RoomCoordinator<S: RoomStore> {
    store: Arc<S>,
    lock_timeout: Option<Duration>,
}

impl<S: RoomStore> RoomCoordinator<S> {
    pub fn new(store: Arc<S>, lock_timeout: Option<Duration>) -> Self {
        Self {
            store,
            lock_timeout,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute `f` with exclusive access to `room_id`.
    ///
    /// `f` receives the locked transaction and hands it back alongside its
    /// result; the transaction is then committed and the committed snapshot
    /// returned with the result. One call touches exactly one room, so no
    /// operation ever holds two room locks.
    ///
    /// # Errors
    ///
    /// `NotFound` if the room does not exist, `Busy` if the lock is not
    /// acquired within the configured timeout, or whatever `f` returns (in
    /// which case nothing is committed).
    pub async fn with_room_lock<T, F, Fut>(
        &self,
        room_id: i64,
        operation: &'static str,
        f: F,
    ) -> Result<(T, RoomSnapshot), RoomError>
    where
        F: FnOnce(S::Transaction) -> Fut + Send,
        Fut: Future<Output = Result<(T, S::Transaction), RoomError>> + Send,
        T: Send,
    {
        let started = Instant::now();
        let tx = self.store.lock_room(room_id, self.lock_timeout).await;
        metrics::record_lock_wait(operation, started.elapsed().as_secs_f64());

        let tx = tx.inspect_err(|e| {
            tracing::debug!(room_id, operation, error = %e, "Room lock not acquired");
        })?;
        tracing::trace!(room_id, operation, "Room lock acquired");

        let (value, tx) = f(tx).await?;
        let snapshot = tx.commit().await?;

        tracing::debug!(
            room_id,
            operation,
            version = snapshot.version(),
            member_count = snapshot.member_count(),
            "Room mutation committed"
        );
        Ok((value, snapshot))
    }
}
