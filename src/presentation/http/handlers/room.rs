//! Room Handlers

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};

use crate::application::dto::request::SearchRoomsQuery;
use crate::application::dto::response::{MembershipResponse, RoomResponse, RoomSearchResponse};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

pub(crate) fn parse_room_id(room_id: &str) -> Result<i64, AppError> {
    room_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid room ID".into()))
}

/// List rooms the caller belongs to
pub async fn list_rooms(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<RoomResponse>>, AppError> {
    let rooms = state.rooms.list_rooms_for_user(auth.user_id).await?;

    Ok(Json(rooms.iter().map(RoomResponse::from).collect()))
}

/// Get a single room
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomResponse>, AppError> {
    let room_id = parse_room_id(&room_id)?;
    let room = state.rooms.get_room(room_id).await?;

    Ok(Json(RoomResponse::from(&room)))
}

/// Search rooms by name
pub async fn search_rooms(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<SearchRoomsQuery>,
) -> Result<Json<Vec<RoomSearchResponse>>, AppError> {
    let results = state
        .rooms
        .search_rooms(query.query.as_deref(), auth.user_id)
        .await?;

    Ok(Json(results.into_iter().map(RoomSearchResponse::from).collect()))
}

/// Join a room
pub async fn join_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(room_id): Path<String>,
) -> Result<Json<MembershipResponse>, AppError> {
    let room_id = parse_room_id(&room_id)?;
    let joined = state.rooms.join_room(auth.user_id, room_id).await?;

    Ok(Json(MembershipResponse::joined(&joined, &auth.as_user())))
}

/// Leave a room
pub async fn leave_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(room_id): Path<String>,
) -> Result<Json<MembershipResponse>, AppError> {
    let room_id = parse_room_id(&room_id)?;
    let left = state.rooms.leave_room(auth.user_id, room_id).await?;

    Ok(Json(MembershipResponse::left(&left, &auth.as_user())))
}
