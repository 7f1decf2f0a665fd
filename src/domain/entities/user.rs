//! User reference.
//!
//! Users are owned by the authentication collaborator; the room core only reads them.

use serde::{Deserialize, Serialize};

/// Maps to the `users` table (id, username).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

impl User {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}
