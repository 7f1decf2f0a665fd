//! Repository Implementations
//!
//! PostgreSQL implementations of the domain storage traits.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::PgRoomStore;
//!
//! async fn setup(pool: PgPool) {
//!     let store = PgRoomStore::new(pool);
//! }
//! ```

pub mod room_repository;

pub use room_repository::{PgRoomStore, PgRoomTransaction};
