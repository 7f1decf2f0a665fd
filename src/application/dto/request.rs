//! Request DTOs
//!
//! Data structures for API request bodies and query strings.

use serde::Deserialize;
use validator::Validate;

/// Maximum message length in characters
pub const MAX_MESSAGE_LENGTH: u64 = 4000;

/// Post message request
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(
        min = 1,
        max = MAX_MESSAGE_LENGTH,
        message = "Content must be 1-4000 characters"
    ))]
    pub content: String,
}

/// Room search query string
///
/// Any query is accepted; one that matches nothing yields an empty list.
#[derive(Debug, Default, Deserialize)]
pub struct SearchRoomsQuery {
    pub query: Option<String>,
}
