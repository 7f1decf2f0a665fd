//! # Domain Layer
//!
//! Room state, membership and message entities, plus the storage contracts
//! that the infrastructure layer implements.
//!
//! ## Structure
//!
//! - **entities**: Room, Membership, Message, User
//! - **store**: `RoomStore` / `RoomTransaction` traits
//!
//! The domain layer has no dependency on infrastructure or presentation.

pub mod entities;
pub mod store;

// Re-export commonly used types
pub use entities::*;
pub use store::{RoomStore, RoomTransaction};
