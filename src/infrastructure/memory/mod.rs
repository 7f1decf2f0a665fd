//! In-Memory Storage
//!
//! Single-process room store: a sharded per-room lock table plus staged
//! transactions committed under one write lock.

pub mod lock_table;
pub mod memory_store;

pub use lock_table::{RoomGuard, RoomLockTable};
pub use memory_store::{MemoryRoomStore, MemoryRoomTransaction};
