//! Tournament API handlers.
//!
//! This module provides HTTP REST endpoints for tournament operations including:
//! - Creating tournaments and moving them through their lifecycle
//! - Locking the prize pool and setting a manual prize pool
//! - Registering players
//! - Settlement previews (money summary and projected standings)
//! - Finalizing a tournament
//!
//! # Examples
//!
//! Lock the prize pool:
//! ```bash
//! curl -X PATCH http://localhost:6970/api/v1/tournaments/1 \
//!   -H "Content-Type: application/json" \
//!   -d '{"prize_pool_locked": true}'
//! ```
//!
//! Finalize:
//! ```bash
//! curl -X POST http://localhost:6970/api/v1/tournaments/1/finalize
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use club_poker::{
    SettlementReport, SettlementSummary, TournamentError,
    settlement::Standing,
    tournament::{
        ActivityEntry, DEFAULT_ACTIVITY_LIMIT, NewTournament, PlayerId, Registration, Tournament,
        TournamentId, TournamentUpdate,
    },
};
use serde::Deserialize;
use std::time::Instant;

use super::AppState;
use super::error::{ApiError, JsonBody, OperationContext};
use super::request_id::RequestId;
use crate::{logging, metrics};

/// Upper bound on activity entries per request
pub const MAX_ACTIVITY_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct RegisterPlayerRequest {
    pub player_id: PlayerId,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

/// Create a tournament.
///
/// The payout structure name is validated here; unknown names are rejected
/// with `400 Bad Request`.
///
/// # Response
///
/// Returns `201 Created` with the stored tournament.
pub async fn create_tournament(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<NewTournament>,
) -> Result<(StatusCode, Json<Tournament>), ApiError> {
    let tournament = state
        .manager
        .create_tournament(&request)
        .await
        .during("create_tournament")?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

/// Get a tournament.
///
/// # Errors
///
/// - `404 Not Found`: Tournament doesn't exist
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Tournament>, ApiError> {
    let tournament = state
        .manager
        .get_tournament(tournament_id)
        .await
        .during("get_tournament")?;
    Ok(Json(tournament))
}

/// Apply a lifecycle update.
///
/// Body fields (all optional): `status`, `prize_pool_locked`,
/// `manual_prize_pool`, `clear_manual_prize_pool`.
///
/// # Errors
///
/// - `400 Bad Request`: Negative manual pool, or set and clear together
/// - `409 Conflict`: Illegal status transition or attempt to unlock
pub async fn update_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    JsonBody(update): JsonBody<TournamentUpdate>,
) -> Result<Json<Tournament>, ApiError> {
    let tournament = state
        .manager
        .update_tournament(tournament_id, &update)
        .await
        .during("update_tournament")?;
    Ok(Json(tournament))
}

/// Finalize a tournament: positions, prizes and points in one transaction.
///
/// Safe to repeat on a completed tournament; the same results are written.
///
/// # Errors
///
/// - `409 Conflict`: Tournament has not started or was cancelled
/// - `504 Gateway Timeout`: Settlement exceeded its deadline and was rolled back
pub async fn finalize(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<SettlementReport>, ApiError> {
    tracing::info!(
        request_id = request_id.as_str(),
        tournament_id = tournament_id,
        "Finalize requested"
    );
    let start = Instant::now();
    let result = state.manager.finalize(tournament_id).await;
    let duration_ms = start.elapsed().as_millis() as u64;
    metrics::settlement_duration_ms(duration_ms as f64);

    match result {
        Ok(report) => {
            metrics::settlements_total("completed");
            metrics::settled_registrations(report.results.len());
            logging::log_settlement(
                tournament_id,
                report.results.len(),
                &report.summary.prize_pool.distributable().to_string(),
                duration_ms,
            );
            Ok(Json(report))
        }
        Err(err) => {
            let outcome = match err {
                TournamentError::Timeout(_) => "timeout",
                _ => "rolled_back",
            };
            metrics::settlements_total(outcome);
            Err(ApiError::new("finalize", err))
        }
    }
}

/// Money summary preview, computed the same way finalize computes it
pub async fn summary(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<SettlementSummary>, ApiError> {
    let summary = state
        .manager
        .settlement_summary(tournament_id)
        .await
        .during("settlement_summary")?;
    Ok(Json(summary))
}

/// Projected standings if the tournament were finalized now
pub async fn standings(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<Standing>>, ApiError> {
    let standings = state
        .manager
        .standings(tournament_id)
        .await
        .during("standings")?;
    Ok(Json(standings))
}

/// Activity log, most recent first.
///
/// `?limit=N` caps the number of entries (default 50, at most 500).
pub async fn activity(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);
    let entries = state
        .manager
        .activity(tournament_id, limit)
        .await
        .during("activity")?;
    Ok(Json(entries))
}

/// List a tournament's registrations
pub async fn list_registrations(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<Registration>>, ApiError> {
    let registrations = state
        .manager
        .get_registrations(tournament_id)
        .await
        .during("list_registrations")?;
    Ok(Json(registrations))
}

/// Register a player.
///
/// # Errors
///
/// - `409 Conflict`: Prize pool locked, tournament closed, or already registered
pub async fn register_player(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    JsonBody(request): JsonBody<RegisterPlayerRequest>,
) -> Result<(StatusCode, Json<Registration>), ApiError> {
    let registration = state
        .manager
        .register_player(tournament_id, request.player_id)
        .await
        .during("register_player")?;
    Ok((StatusCode::CREATED, Json(registration)))
}
