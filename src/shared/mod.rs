//! Shared Utilities
//!
//! Error types, snowflake IDs and request validation helpers shared by the
//! room core and the HTTP layer.

pub mod error;
pub mod snowflake;
pub mod validation;
