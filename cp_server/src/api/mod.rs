//! HTTP API for the settlement engine.
//!
//! A thin axum layer over [`TournamentManager`]: every handler forwards to one
//! manager operation and maps [`TournamentError`](club_poker::TournamentError)
//! onto a status code. No settlement math lives here.
//!
//! # Modules
//!
//! - [`tournaments`]: Lifecycle, registration, previews and finalize
//! - [`registrations`]: Registration updates and points systems
//! - [`error`]: Error to response mapping
//! - [`request_id`]: `x-request-id` correlation middleware
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use club_poker::TournamentManager;
//! use club_poker::db::MemoryStore;
//! use cp_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = TournamentManager::new(Arc::new(MemoryStore::new()));
//! let app = create_router(AppState::new(manager));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:6970").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod error;
pub mod registrations;
pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
};
use club_poker::TournamentManager;
use serde_json::json;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; the manager holds its store behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub manager: TournamentManager,
}

impl AppState {
    pub fn new(manager: TournamentManager) -> Self {
        Self { manager }
    }
}

/// Create the application router.
///
/// # Endpoint Summary
///
/// ```text
/// GET   /health                                 - Store health check
/// POST  /api/v1/tournaments                     - Create tournament
/// GET   /api/v1/tournaments/{id}                - Get tournament
/// PATCH /api/v1/tournaments/{id}                - Status, pool lock, manual pool
/// POST  /api/v1/tournaments/{id}/finalize       - Settle the tournament
/// GET   /api/v1/tournaments/{id}/summary        - Money summary preview
/// GET   /api/v1/tournaments/{id}/standings      - Standings preview
/// GET   /api/v1/tournaments/{id}/activity       - Activity log
/// GET   /api/v1/tournaments/{id}/registrations  - List registrations
/// POST  /api/v1/tournaments/{id}/registrations  - Register a player
/// PATCH /api/v1/registrations/{id}              - Apply a registration update
/// POST  /api/v1/points-systems                  - Create a points system
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/tournaments", post(tournaments::create_tournament))
        .route(
            "/tournaments/{tournament_id}",
            get(tournaments::get_tournament).patch(tournaments::update_tournament),
        )
        .route(
            "/tournaments/{tournament_id}/finalize",
            post(tournaments::finalize),
        )
        .route("/tournaments/{tournament_id}/summary", get(tournaments::summary))
        .route(
            "/tournaments/{tournament_id}/standings",
            get(tournaments::standings),
        )
        .route(
            "/tournaments/{tournament_id}/activity",
            get(tournaments::activity),
        )
        .route(
            "/tournaments/{tournament_id}/registrations",
            get(tournaments::list_registrations).post(tournaments::register_player),
        )
        .route(
            "/registrations/{registration_id}",
            patch(registrations::update_registration),
        )
        .route(
            "/points-systems",
            post(registrations::create_points_system),
        )
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:6970/health
/// # {"status":"healthy","store":true,"version":"3.0.1","timestamp":"2026-03-06T21:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = state.manager.store().health_check().await.is_ok();

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
