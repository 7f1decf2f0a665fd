//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **RoomCoordinator**: per-room exclusive sections with commit/rollback
//! - **RoomService**: join, leave, post and room/message queries

pub mod coordinator;
pub mod room_service;

pub use coordinator::RoomCoordinator;

// Re-export room service types
pub use room_service::{
    JoinedRoom, LeftRoom, PostedMessage, RoomMessages, RoomService, RoomServiceImpl,
};
