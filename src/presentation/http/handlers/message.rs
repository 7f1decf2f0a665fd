//! Message Handlers

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use super::room::parse_room_id;
use crate::application::dto::request::SendMessageRequest;
use crate::application::dto::response::MessageResponse;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

/// Get messages from a room, newest first
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let room_id = parse_room_id(&room_id)?;

    let listed = state.rooms.list_messages(auth.user_id, room_id).await?;
    let version = listed.room.version();

    let responses = listed
        .messages
        .iter()
        .map(|message| MessageResponse::new(message, version))
        .collect();

    Ok(Json(responses))
}

/// Post a message to a room
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(room_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let room_id = parse_room_id(&room_id)?;

    // Validate request
    body.validate().map_err(validation_error)?;

    let posted = state
        .rooms
        .post_message(&auth.as_user(), room_id, body.content)
        .await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from(&posted))))
}
