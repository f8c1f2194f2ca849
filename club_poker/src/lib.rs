//! # Club Poker
//!
//! Tournament settlement engine for poker clubs.
//!
//! Turns a tournament's registrations (buy-ins, rebuys, add-ons, eliminations)
//! into a final ranking, a rake-adjusted prize pool, per-position payouts and
//! seasonal league points, and enforces the lifecycle rules that decide when
//! money-affecting fields may still change.
//!
//! ## Core Modules
//!
//! - [`settlement`]: Revenue, rake, prize pool, payouts, ranking and high-hand math
//! - [`points`]: Season points systems and position allocations
//! - [`tournament`]: Models, lifecycle state machine and the [`TournamentManager`]
//! - [`db`]: Store traits with PostgreSQL and in-memory implementations
//!
//! ## Example
//!
//! ```
//! use club_poker::settlement::PayoutStructure;
//! use rust_decimal::Decimal;
//!
//! let prizes = PayoutStructure::Standard.distribute(Decimal::from(360));
//! assert_eq!(prizes.payout_for_position(1), Some(Decimal::from(180)));
//! ```

/// Persistence: store traits, PostgreSQL and in-memory stores.
pub mod db;

/// Season points.
pub mod points;

/// Settlement math shared by previews and finalize.
pub mod settlement;

/// Tournament lifecycle and orchestration.
pub mod tournament;

pub use settlement::{PayoutStructure, SettlementReport, SettlementSummary};
pub use tournament::{TournamentError, TournamentManager, TournamentResult};
