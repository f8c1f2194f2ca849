//! HTTP server for the club poker settlement engine.
//!
//! Exposes tournament lifecycle, registration updates, settlement previews and
//! finalize over JSON, backed by PostgreSQL or an in-memory store.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
