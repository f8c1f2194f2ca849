//! Tournament settlement server.
//!
//! Serves the settlement API over HTTP, backed by PostgreSQL or, with
//! `--memory`, by an in-process store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use club_poker::{
    TournamentManager,
    db::{Database, MemoryStore, TournamentStore},
};
use cp_server::{
    api,
    config::{ServerConfig, StoreConfig},
    logging, metrics,
};
use pico_args::Arguments;
use tracing::{info, warn};

const HELP: &str = "\
Run the club poker tournament settlement server

USAGE:
  cp_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6970]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --memory                 Use an in-memory store (data is lost on exit)
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  DB_MAX_CONNECTIONS       Pool size (default: 10)
  SETTLEMENT_TIMEOUT_SECS  Finalize deadline in seconds (default: 10)
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  RUST_LOG                 Log filter (default: info,sqlx=warn,hyper=warn)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let args = Args {
        bind: pargs
            .opt_value_from_str("--bind")
            .context("--bind expects IP:PORT")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        memory: pargs.contains("--memory"),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {remaining:?}");
    }

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.memory)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exported at http://{addr}/metrics");
    }

    let store: Arc<dyn TournamentStore> = match &config.store {
        StoreConfig::Postgres(database) => {
            info!("Connecting to database");
            let db = Database::new(database)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to run migrations")?;
            info!("Database connected and migrated");
            Arc::new(db.tournament_store())
        }
        StoreConfig::Memory => {
            warn!("Using in-memory store; tournaments are lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let manager =
        TournamentManager::new(store).with_settlement_timeout(config.settlement_timeout);
    let app = api::create_router(api::AppState::new(manager));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Settlement server running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C handler: {e}");
        std::future::pending::<()>().await;
    }
}
