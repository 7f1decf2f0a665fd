//! Application Layer
//!
//! Room coordination, the room service and the DTOs exchanged with the
//! HTTP layer.

pub mod dto;
pub mod services;
