//! Room endpoints.

use crate::server::state::AppState;
use crate::types::{Room, RoomId};
use axum::extract::{Path, State};
use lodging_web::{ApiError, Envelope};
use serde::{Deserialize, Serialize};

/// All listed rooms.
#[derive(Debug, Serialize)]
pub struct RoomsBody {
    rooms: Vec<Room>,
}

/// A single room.
#[derive(Debug, Serialize)]
pub struct RoomBody {
    room: Room,
}

/// `GET /api/rooms`
pub async fn list_rooms(
    State(state): State<AppState>,
) -> Result<Envelope<RoomsBody>, ApiError> {
    let rooms = state
        .rooms
        .list_rooms()
        .await
        .map_err(|e| ApiError::internal("Failed to load rooms").with_source(e.into()))?;
    Ok(Envelope::ok(RoomsBody { rooms }))
}

/// Path parameter for room lookups.
#[derive(Debug, Deserialize)]
pub struct RoomPath {
    /// Room to fetch
    pub id: RoomId,
}

/// `GET /api/rooms/:id`
pub async fn get_room(
    State(state): State<AppState>,
    Path(path): Path<RoomPath>,
) -> Result<Envelope<RoomBody>, ApiError> {
    let room = state
        .rooms
        .get_room(path.id)
        .await
        .map_err(|e| ApiError::internal("Failed to load room").with_source(e.into()))?;

    match room {
        Some(room) => Ok(Envelope::ok(RoomBody { room })),
        None => Ok(Envelope::fail("Room not found")),
    }
}
