//! Repository trait definitions for testability and dependency injection.
//!
//! Settlement and lifecycle writes must observe and modify the same committed
//! state, so storage is exposed as a unit of work: [`TournamentStore::begin`]
//! hands out a [`StoreTransaction`] whose reads take row locks and whose writes
//! only become visible on [`StoreTransaction::commit`]. Dropping a transaction
//! without committing discards every write made through it.

use async_trait::async_trait;

use crate::points::{NewPointsSystem, PointsTable};
use crate::settlement::RegistrationResult;
use crate::tournament::{
    ActivityEntry, NewActivity, NewTournament, PlayerId, Registration, RegistrationChange,
    RegistrationId, Tournament, TournamentChange, TournamentId, TournamentResult,
};

/// Storage entry point
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Start a unit of work
    async fn begin(&self) -> TournamentResult<Box<dyn StoreTransaction>>;

    /// Validate and persist a tournament configuration
    async fn create_tournament(&self, config: &NewTournament) -> TournamentResult<Tournament>;

    /// Validate and persist a points system with its allocations
    async fn create_points_system(&self, system: &NewPointsSystem)
    -> TournamentResult<PointsTable>;

    /// Check that the backing store is reachable
    async fn health_check(&self) -> TournamentResult<()>;
}

/// One unit of work against the store
#[async_trait]
pub trait StoreTransaction: Send {
    /// Read a tournament without locking it
    async fn tournament(&mut self, id: TournamentId) -> TournamentResult<Tournament>;

    /// Read a tournament and hold its row lock until the transaction ends
    async fn lock_tournament(&mut self, id: TournamentId) -> TournamentResult<Tournament>;

    /// Read a registration without locking it
    async fn registration(&mut self, id: RegistrationId) -> TournamentResult<Registration>;

    /// Read a registration and hold its row lock until the transaction ends
    async fn lock_registration(&mut self, id: RegistrationId) -> TournamentResult<Registration>;

    /// All registrations of a tournament, ordered by id
    async fn registrations(
        &mut self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Registration>>;

    async fn find_registration_by_player(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Option<Registration>>;

    /// Load a points system, resolving stored overlaps leniently
    async fn points_table(&mut self, points_system_id: i64) -> TournamentResult<PointsTable>;

    /// Insert a fresh registration with a single buy-in
    async fn insert_registration(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Registration>;

    /// Apply counter deltas and field changes to one registration
    async fn apply_registration_change(
        &mut self,
        change: &RegistrationChange,
    ) -> TournamentResult<Registration>;

    /// Overwrite the provisional finishing position of a registration
    async fn set_final_position(
        &mut self,
        registration_id: RegistrationId,
        position: Option<u32>,
    ) -> TournamentResult<()>;

    /// Sequence number for the next elimination in a tournament
    async fn next_elimination_seq(&mut self, tournament_id: TournamentId) -> TournamentResult<i64>;

    /// Write position, prize and (optionally) points for one registration
    async fn write_settlement_result(
        &mut self,
        result: &RegistrationResult,
        write_points: bool,
    ) -> TournamentResult<()>;

    /// Apply a lifecycle change. The lock flag can only be raised.
    async fn update_tournament(
        &mut self,
        id: TournamentId,
        change: &TournamentChange,
    ) -> TournamentResult<Tournament>;

    async fn record_activity(&mut self, entry: &NewActivity) -> TournamentResult<ActivityEntry>;

    /// Most recent entries first
    async fn activity(
        &mut self,
        tournament_id: TournamentId,
        limit: i64,
    ) -> TournamentResult<Vec<ActivityEntry>>;

    /// Publish every write made through this transaction
    async fn commit(&mut self) -> TournamentResult<()>;
}
