//! Tournament manager: every lifecycle, registration and settlement operation
//! runs here as one store transaction.

use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::activity::{ActivityEntry, ActivityKind, NewActivity};
use super::errors::{TournamentError, TournamentResult};
use super::lifecycle::{
    RegistrationChange, RegistrationContext, TournamentChange, ensure_can_finalize,
    ensure_can_register, plan_registration_change, plan_tournament_change,
};
use super::models::{
    NewTournament, PlayerId, Registration, RegistrationId, RegistrationUpdate, Tournament,
    TournamentId, TournamentUpdate,
};
use crate::db::repository::{StoreTransaction, TournamentStore};
use crate::db::timeouts::{DEFAULT_SETTLEMENT_TIMEOUT, with_timeout};
use crate::points::{NewPointsSystem, PointsTable};
use crate::settlement::{
    HighHandSummary, SettlementReport, SettlementSummary, Standing, plan_settlement, rank,
};

/// Default number of activity entries returned
pub const DEFAULT_ACTIVITY_LIMIT: i64 = 50;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    store: Arc<dyn TournamentStore>,
    settlement_timeout: Duration,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(store: Arc<dyn TournamentStore>) -> Self {
        Self {
            store,
            settlement_timeout: DEFAULT_SETTLEMENT_TIMEOUT,
        }
    }

    /// Override the deadline for finalize
    pub fn with_settlement_timeout(mut self, timeout: Duration) -> Self {
        self.settlement_timeout = timeout;
        self
    }

    pub fn settlement_timeout(&self) -> Duration {
        self.settlement_timeout
    }

    pub fn store(&self) -> &Arc<dyn TournamentStore> {
        &self.store
    }

    /// Create a new tournament
    pub async fn create_tournament(&self, config: &NewTournament) -> TournamentResult<Tournament> {
        let tournament = self.store.create_tournament(config).await?;
        info!(
            "Created tournament {} '{}' for club {} ({} payouts)",
            tournament.id,
            tournament.name,
            tournament.club_id,
            tournament.payout_structure.name()
        );
        Ok(tournament)
    }

    /// Create a points system for a season
    pub async fn create_points_system(
        &self,
        system: &NewPointsSystem,
    ) -> TournamentResult<PointsTable> {
        let table = self.store.create_points_system(system).await?;
        info!(
            "Created points system {} for season {}",
            table.system().id,
            table.system().season_id
        );
        Ok(table)
    }

    /// Get tournament information
    pub async fn get_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        let mut tx = self.store.begin().await?;
        tx.tournament(tournament_id).await
    }

    /// Get tournament registrations, ordered by id
    pub async fn get_registrations(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Registration>> {
        let mut tx = self.store.begin().await?;
        tx.tournament(tournament_id).await?;
        tx.registrations(tournament_id).await
    }

    /// Money summary computed from the current registrations
    pub async fn settlement_summary(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<SettlementSummary> {
        let mut tx = self.store.begin().await?;
        let tournament = tx.tournament(tournament_id).await?;
        let registrations = tx.registrations(tournament_id).await?;
        Ok(SettlementSummary::compute(&tournament, &registrations))
    }

    /// Projected standings if the tournament were finalized now
    pub async fn standings(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Standing>> {
        let mut tx = self.store.begin().await?;
        let tournament = tx.tournament(tournament_id).await?;
        let registrations = tx.registrations(tournament_id).await?;
        let points = load_points_table(tx.as_mut(), &tournament).await?;

        let plan = plan_settlement(&tournament, &registrations, points.as_ref());
        Ok(plan.standings(&registrations))
    }

    /// Activity log, most recent first
    pub async fn activity(
        &self,
        tournament_id: TournamentId,
        limit: i64,
    ) -> TournamentResult<Vec<ActivityEntry>> {
        let mut tx = self.store.begin().await?;
        tx.tournament(tournament_id).await?;
        tx.activity(tournament_id, limit).await
    }

    /// Compute and persist final positions, prizes and points, then mark the
    /// tournament completed. All of it commits together or not at all.
    pub async fn finalize(&self, tournament_id: TournamentId) -> TournamentResult<SettlementReport> {
        let result = with_timeout(self.settlement_timeout, self.finalize_unit(tournament_id)).await;
        if let Err(err) = &result {
            warn!("Finalize of tournament {tournament_id} rolled back: {err}");
        }
        result
    }

    async fn finalize_unit(&self, tournament_id: TournamentId) -> TournamentResult<SettlementReport> {
        let mut tx = self.store.begin().await?;
        let tournament = tx.lock_tournament(tournament_id).await?;
        ensure_can_finalize(&tournament)?;

        let registrations = tx.registrations(tournament_id).await?;
        let points = load_points_table(tx.as_mut(), &tournament).await?;
        let plan = plan_settlement(&tournament, &registrations, points.as_ref());

        for result in &plan.results {
            tx.write_settlement_result(result, plan.write_points).await?;
        }

        let pool = plan.summary.prize_pool.distributable();
        let change = TournamentChange::completed(
            &tournament,
            format!(
                "Settled {} registrations, prize pool {pool}",
                plan.results.len()
            ),
        );
        tx.update_tournament(tournament_id, &change).await?;
        record_all(tx.as_mut(), &change.activity).await?;
        tx.commit().await?;

        info!(
            "Finalized tournament {tournament_id}: {} registrations, pool {pool}, {} paid places",
            plan.results.len(),
            plan.summary.prizes.payouts.len()
        );
        Ok(SettlementReport::new(plan, Utc::now()))
    }

    /// Apply a lifecycle update: status, prize pool lock, manual prize pool
    pub async fn update_tournament(
        &self,
        tournament_id: TournamentId,
        update: &TournamentUpdate,
    ) -> TournamentResult<Tournament> {
        let mut tx = self.store.begin().await?;
        let tournament = tx.lock_tournament(tournament_id).await?;
        let change = plan_tournament_change(&tournament, update)?;
        if change.is_empty() {
            return Ok(tournament);
        }

        let updated = tx.update_tournament(tournament_id, &change).await?;
        record_all(tx.as_mut(), &change.activity).await?;
        tx.commit().await?;

        if change.lock_prize_pool {
            info!("Prize pool of tournament {tournament_id} locked");
        }
        if let Some(status) = change.status {
            info!(
                "Tournament {tournament_id} moved from {} to {status}",
                tournament.status
            );
        }
        Ok(updated)
    }

    /// Register a player. Rejected once the prize pool is locked.
    pub async fn register_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Registration> {
        let mut tx = self.store.begin().await?;
        let tournament = tx.lock_tournament(tournament_id).await?;
        ensure_can_register(&tournament)?;

        if tx
            .find_registration_by_player(tournament_id, player_id)
            .await?
            .is_some()
        {
            return Err(TournamentError::AlreadyRegistered {
                tournament_id,
                player_id,
            });
        }

        let registration = tx.insert_registration(tournament_id, player_id).await?;
        tx.record_activity(&NewActivity::registration(
            tournament_id,
            registration.id,
            ActivityKind::Registration,
            format!("Player {player_id} registered"),
        ))
        .await?;
        refresh_provisional_positions(tx.as_mut(), tournament_id).await?;
        tx.commit().await?;

        info!("Player {player_id} registered for tournament {tournament_id}");
        Ok(registration)
    }

    /// Apply rebuys, add-ons, knockouts, an elimination or high-hand changes
    pub async fn update_registration(
        &self,
        registration_id: RegistrationId,
        update: &RegistrationUpdate,
    ) -> TournamentResult<Registration> {
        let mut tx = self.store.begin().await?;

        // Tournament row first, so every writer locks in the same order
        let tournament_id = tx.registration(registration_id).await?.tournament_id;
        let tournament = tx.lock_tournament(tournament_id).await?;
        let registration = tx.lock_registration(registration_id).await?;

        if update.is_empty() {
            return Ok(registration);
        }

        let knocker = match update.eliminate.as_ref().and_then(|e| e.eliminated_by) {
            Some(knocker_id) if knocker_id != registration_id => {
                Some(tx.lock_registration(knocker_id).await?)
            }
            _ => None,
        };

        let registrations = tx.registrations(tournament_id).await?;
        let active = registrations.iter().filter(|r| !r.is_eliminated).count();
        let context = RegistrationContext {
            active_registrations: u32::try_from(active).unwrap_or(u32::MAX),
            next_elimination_seq: tx.next_elimination_seq(tournament_id).await?,
            knocker: knocker.as_ref(),
            high_hand_share: tournament
                .high_hand
                .as_ref()
                .map(|config| HighHandSummary::compute(config, &registrations).per_winner),
            now: Utc::now(),
        };

        let change = plan_registration_change(&tournament, &registration, update, &context)?;
        let updated = tx.apply_registration_change(&change).await?;
        record_all(tx.as_mut(), &change.activity).await?;

        if let Some(knocker) = &knocker {
            let credit = RegistrationChange::knockout_credit(knocker, &registration);
            tx.apply_registration_change(&credit).await?;
            record_all(tx.as_mut(), &credit.activity).await?;
        }

        let updated = if change.elimination.is_some() {
            refresh_provisional_positions(tx.as_mut(), tournament_id).await?;
            tx.registration(registration_id).await?
        } else {
            updated
        };
        tx.commit().await?;

        Ok(updated)
    }
}

async fn record_all(
    tx: &mut dyn StoreTransaction,
    activity: &[NewActivity],
) -> TournamentResult<()> {
    for entry in activity {
        tx.record_activity(entry).await?;
    }
    Ok(())
}

/// Points table for a tournament that tracks points, if it has one
async fn load_points_table(
    tx: &mut dyn StoreTransaction,
    tournament: &Tournament,
) -> TournamentResult<Option<PointsTable>> {
    if !tournament.track_points {
        return Ok(None);
    }
    match tournament.points_system_id {
        Some(system_id) => Ok(Some(tx.points_table(system_id).await?)),
        None => {
            warn!(
                "Tournament {} tracks points but has no points system; no points will be written",
                tournament.id
            );
            Ok(None)
        }
    }
}

/// Re-rank eliminated registrations so their provisional positions stay
/// consistent with the field size
async fn refresh_provisional_positions(
    tx: &mut dyn StoreTransaction,
    tournament_id: TournamentId,
) -> TournamentResult<()> {
    let registrations = tx.registrations(tournament_id).await?;
    for entry in rank(&registrations) {
        let Some(registration) = registrations
            .iter()
            .find(|r| r.id == entry.registration_id)
        else {
            continue;
        };
        if registration.is_eliminated && registration.final_position != Some(entry.position) {
            tx.set_final_position(registration.id, Some(entry.position))
                .await?;
        }
    }
    Ok(())
}
