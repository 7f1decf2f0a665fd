//! # Domain Entities
//!
//! Core domain entities of the room subsystem. All entities map directly to
//! their corresponding database tables.
//!
//! - **Room**: versioned room record with cached member count and last message
//! - **Membership**: a user's membership in a room
//! - **Message**: an immutable message in a room's log
//! - **User**: read-only identity supplied by the auth collaborator

mod membership;
mod message;
mod room;
mod user;

pub use membership::Membership;
pub use message::Message;
pub use room::{Room, RoomSearchResult, RoomSnapshot};
pub use user::User;
