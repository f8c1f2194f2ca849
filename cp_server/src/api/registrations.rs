//! Registration and points system handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use club_poker::{
    points::{NewPointsSystem, PointsAllocation, PointsSystem},
    tournament::{Registration, RegistrationId, RegistrationUpdate},
};
use serde::Serialize;

use super::AppState;
use super::error::{ApiError, JsonBody, OperationContext};

/// Points system as returned to clients
#[derive(Debug, Serialize)]
pub struct PointsSystemResponse {
    pub system: PointsSystem,
    pub allocations: Vec<PointsAllocation>,
}

/// Apply a registration update.
///
/// Counters are deltas (`add_rebuys`, `add_addons`, `add_knockouts`); absolute
/// totals are never accepted from clients.
///
/// ```json
/// {"eliminate": {"eliminated_by": 12}}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid elimination or high-hand award, or a body that
///   does not decode (a negative delta included)
/// - `404 Not Found`: Registration or knocker doesn't exist
/// - `409 Conflict`: Money change after the prize pool was locked, or any
///   change other than a high-hand award once the tournament is completed
pub async fn update_registration(
    State(state): State<AppState>,
    Path(registration_id): Path<RegistrationId>,
    JsonBody(update): JsonBody<RegistrationUpdate>,
) -> Result<Json<Registration>, ApiError> {
    let registration = state
        .manager
        .update_registration(registration_id, &update)
        .await
        .during("update_registration")?;
    Ok(Json(registration))
}

/// Create a season points system with its position allocations.
///
/// # Errors
///
/// - `400 Bad Request`: Overlapping or malformed allocations
pub async fn create_points_system(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<NewPointsSystem>,
) -> Result<(StatusCode, Json<PointsSystemResponse>), ApiError> {
    let table = state
        .manager
        .create_points_system(&request)
        .await
        .during("create_points_system")?;
    let response = PointsSystemResponse {
        system: table.system().clone(),
        allocations: table.allocations().to_vec(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}
