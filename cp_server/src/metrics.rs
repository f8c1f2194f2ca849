//! Prometheus metrics for the settlement server.
//!
//! Metrics are exposed in Prometheus text format on `METRICS_BIND` when it is
//! set. Recording is a no-op until an exporter is installed, so handlers call
//! these unconditionally.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use cp_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/tournaments/{id}/finalize", 200);
//! metrics::settlements_total("completed");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Settlement Metrics
// ============================================================================

/// Count a finalize attempt by outcome (`completed`, `rolled_back`, `timeout`)
pub fn settlements_total(outcome: &'static str) {
    metrics::counter!("settlements_total", "outcome" => outcome).increment(1);
}

/// Record how long a finalize took
pub fn settlement_duration_ms(duration_ms: f64) {
    metrics::histogram!("settlement_duration_ms").record(duration_ms);
}

/// Record the size of a settled field
pub fn settled_registrations(count: usize) {
    metrics::histogram!("settled_registrations").record(count as f64);
}

/// Count a request refused by a lifecycle rule (lock, status, duplicate)
pub fn policy_rejections_total(operation: &'static str) {
    metrics::counter!("policy_rejections_total", "operation" => operation).increment(1);
}
