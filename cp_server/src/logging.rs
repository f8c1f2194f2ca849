//! Structured logging configuration.
//!
//! The settlement library logs through the `log` facade; the subscriber
//! installed here forwards those records so library and request logs share
//! one stream.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use cp_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a completed API request
pub fn log_api_request(
    request_id: &str,
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
) {
    if status_code >= 500 {
        tracing::error!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request failed"
        );
    } else {
        tracing::info!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request completed"
        );
    }
}

/// Log a finalize outcome with its key figures
pub fn log_settlement(tournament_id: i64, registrations: usize, prize_pool: &str, duration_ms: u64) {
    if duration_ms > 1000 {
        tracing::warn!(
            tournament_id = tournament_id,
            registrations = registrations,
            prize_pool = prize_pool,
            duration_ms = duration_ms,
            "PERFORMANCE: Slow settlement"
        );
    } else {
        tracing::info!(
            tournament_id = tournament_id,
            registrations = registrations,
            prize_pool = prize_pool,
            duration_ms = duration_ms,
            "Tournament settled"
        );
    }
}
