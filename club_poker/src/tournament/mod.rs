//! Tournament lifecycle, registrations and settlement orchestration.
//!
//! This module provides:
//! - Tournament and registration models
//! - The status state machine and the one-way prize pool lock
//! - Lock-gated registration updates (rebuys, add-ons, eliminations, high hands)
//! - Finalize, which settles positions, prizes and points in one transaction
//! - An activity log of every change
//!
//! ## Example
//!
//! ```no_run
//! use club_poker::db::{Database, DatabaseConfig};
//! use club_poker::tournament::{NewTournament, TournamentManager, TournamentStatus, TournamentUpdate};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()?).await?;
//!     let manager = TournamentManager::new(Arc::new(db.tournament_store()));
//!
//!     let tournament = manager
//!         .create_tournament(&NewTournament::new(1, "Friday Freezeout", Decimal::from(50)))
//!         .await?;
//!     let open = TournamentUpdate {
//!         status: Some(TournamentStatus::Registration),
//!         ..Default::default()
//!     };
//!     manager.update_tournament(tournament.id, &open).await?;
//!     manager.register_player(tournament.id, 42).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod activity;
pub mod errors;
pub mod lifecycle;
pub mod manager;
pub mod models;

pub use activity::{ActivityEntry, ActivityKind, NewActivity};
pub use errors::{ErrorKind, TournamentError, TournamentResult};
pub use lifecycle::{
    Elimination, RegistrationChange, RegistrationContext, TournamentChange, can_transition_to,
    ensure_can_finalize, ensure_can_register, plan_registration_change, plan_tournament_change,
};
pub use manager::{DEFAULT_ACTIVITY_LIMIT, TournamentManager};
pub use models::{
    EliminationRequest, NewTournament, PlayerId, Registration, RegistrationId,
    RegistrationUpdate, Tournament, TournamentId, TournamentStatus, TournamentUpdate,
};
