//! In-memory store.
//!
//! Transactions are serialised through a single async mutex. Each transaction
//! works on a copy of the state and publishes it on commit, so a dropped or
//! failed transaction leaves nothing behind.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::repository::{StoreTransaction, TournamentStore};
use crate::points::{NewPointsSystem, PointsAllocation, PointsSystem, PointsTable};
use crate::settlement::RegistrationResult;
use crate::tournament::{
    ActivityEntry, NewActivity, NewTournament, PlayerId, Registration, RegistrationChange,
    RegistrationId, Tournament, TournamentChange, TournamentError, TournamentId,
    TournamentResult,
};

const NO_FAILURE: usize = usize::MAX;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tournaments: BTreeMap<TournamentId, Tournament>,
    registrations: BTreeMap<RegistrationId, Registration>,
    points_systems: BTreeMap<i64, PointsSystem>,
    allocations: Vec<PointsAllocation>,
    activity: Vec<ActivityEntry>,
    last_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn tournament(&self, id: TournamentId) -> TournamentResult<&Tournament> {
        self.tournaments.get(&id).ok_or(TournamentError::NotFound(id))
    }

    fn registration_mut(&mut self, id: RegistrationId) -> TournamentResult<&mut Registration> {
        self.registrations
            .get_mut(&id)
            .ok_or(TournamentError::RegistrationNotFound(id))
    }

    /// Mirrors the unique (tournament, final_position) constraint
    fn check_final_positions(&self) -> TournamentResult<()> {
        let mut seen = HashSet::new();
        for registration in self.registrations.values() {
            let Some(position) = registration.final_position else {
                continue;
            };
            if !seen.insert((registration.tournament_id, position)) {
                return Err(TournamentError::Storage(format!(
                    "duplicate final position {position} in tournament {}",
                    registration.tournament_id
                )));
            }
        }
        Ok(())
    }
}

/// Store backed by process memory, used by tests and `--memory` servers
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_settlement_write_at: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            fail_settlement_write_at: Arc::new(AtomicUsize::new(NO_FAILURE)),
        }
    }

    /// Make the next transaction fail on its `n`th settlement write (0-based).
    /// Applies once.
    pub fn fail_settlement_write_at(&self, n: usize) {
        self.fail_settlement_write_at.store(n, Ordering::SeqCst);
    }

    /// Seed a registration directly, bypassing lifecycle checks
    pub async fn insert_registration_raw(&self, mut registration: Registration) -> Registration {
        let mut state = self.state.lock().await;
        if registration.id == 0 {
            registration.id = state.next_id();
        } else {
            state.last_id = state.last_id.max(registration.id);
        }
        state
            .registrations
            .insert(registration.id, registration.clone());
        registration
    }

    /// Overwrite a tournament directly, bypassing lifecycle checks
    pub async fn put_tournament(&self, tournament: Tournament) {
        let mut state = self.state.lock().await;
        state.last_id = state.last_id.max(tournament.id);
        state.tournaments.insert(tournament.id, tournament);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TournamentStore for MemoryStore {
    async fn begin(&self) -> TournamentResult<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        let fail_at = self
            .fail_settlement_write_at
            .swap(NO_FAILURE, Ordering::SeqCst);

        Ok(Box::new(MemoryTransaction {
            guard,
            staged,
            fail_at: (fail_at != NO_FAILURE).then_some(fail_at),
            settlement_writes: 0,
        }))
    }

    async fn create_tournament(&self, config: &NewTournament) -> TournamentResult<Tournament> {
        let mut state = self.state.lock().await;
        if let Some(system_id) = config.points_system_id {
            if !state.points_systems.contains_key(&system_id) {
                return Err(TournamentError::PointsSystemNotFound(system_id));
            }
        }
        let id = state.next_id();
        let tournament = Tournament::new(id, config)?;
        state.tournaments.insert(id, tournament.clone());
        Ok(tournament)
    }

    async fn create_points_system(
        &self,
        system: &NewPointsSystem,
    ) -> TournamentResult<PointsTable> {
        system.validate()?;

        let mut state = self.state.lock().await;
        let id = state.next_id();
        let points_system = PointsSystem {
            id,
            season_id: system.season_id,
            name: system.name.clone(),
            participation_points: system.participation_points,
            knockout_points: system.knockout_points,
        };
        let mut allocations = Vec::with_capacity(system.allocations.len());
        for allocation in &system.allocations {
            allocations.push(PointsAllocation {
                id: state.next_id(),
                points_system_id: id,
                position: allocation.position,
                position_end: allocation.position_end,
                points: allocation.points,
            });
        }

        let table = PointsTable::new(points_system.clone(), allocations.clone())?;
        state.points_systems.insert(id, points_system);
        state.allocations.extend(allocations);
        Ok(table)
    }

    async fn health_check(&self) -> TournamentResult<()> {
        Ok(())
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_at: Option<usize>,
    settlement_writes: usize,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn tournament(&mut self, id: TournamentId) -> TournamentResult<Tournament> {
        self.staged.tournament(id).cloned()
    }

    async fn lock_tournament(&mut self, id: TournamentId) -> TournamentResult<Tournament> {
        // The store mutex is already held for the whole transaction
        self.tournament(id).await
    }

    async fn registration(&mut self, id: RegistrationId) -> TournamentResult<Registration> {
        self.staged
            .registrations
            .get(&id)
            .cloned()
            .ok_or(TournamentError::RegistrationNotFound(id))
    }

    async fn lock_registration(&mut self, id: RegistrationId) -> TournamentResult<Registration> {
        self.registration(id).await
    }

    async fn registrations(
        &mut self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Registration>> {
        Ok(self
            .staged
            .registrations
            .values()
            .filter(|r| r.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn find_registration_by_player(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Option<Registration>> {
        Ok(self
            .staged
            .registrations
            .values()
            .find(|r| r.tournament_id == tournament_id && r.player_id == player_id)
            .cloned())
    }

    async fn points_table(&mut self, points_system_id: i64) -> TournamentResult<PointsTable> {
        let system = self
            .staged
            .points_systems
            .get(&points_system_id)
            .cloned()
            .ok_or(TournamentError::PointsSystemNotFound(points_system_id))?;
        let allocations = self
            .staged
            .allocations
            .iter()
            .filter(|a| a.points_system_id == points_system_id)
            .copied()
            .collect();
        Ok(PointsTable::lenient(system, allocations))
    }

    async fn insert_registration(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Registration> {
        self.staged.tournament(tournament_id)?;
        if self
            .find_registration_by_player(tournament_id, player_id)
            .await?
            .is_some()
        {
            return Err(TournamentError::AlreadyRegistered {
                tournament_id,
                player_id,
            });
        }

        let id = self.staged.next_id();
        let registration = Registration::new(id, tournament_id, player_id);
        self.staged
            .registrations
            .insert(id, registration.clone());
        Ok(registration)
    }

    async fn apply_registration_change(
        &mut self,
        change: &RegistrationChange,
    ) -> TournamentResult<Registration> {
        let registration = self.staged.registration_mut(change.registration_id)?;

        registration.rebuys = registration.rebuys.saturating_add(change.add_rebuys);
        registration.addons = registration.addons.saturating_add(change.add_addons);
        registration.knockouts = registration.knockouts.saturating_add(change.add_knockouts);

        if let Some(elimination) = &change.elimination {
            registration.is_eliminated = true;
            registration.elimination_time = Some(elimination.at);
            registration.eliminated_by = elimination.eliminated_by;
            registration.elimination_seq = Some(elimination.seq);
            registration.final_position = Some(elimination.provisional_position);
        }
        if let Some(entering) = change.entering_high_hands {
            registration.entering_high_hands = entering;
        }
        if let Some(winner) = change.high_hand_winner {
            registration.high_hand_winner = winner;
        }
        if let Some(amount) = change.high_hand_amount {
            registration.high_hand_amount = amount;
        }

        Ok(registration.clone())
    }

    async fn set_final_position(
        &mut self,
        registration_id: RegistrationId,
        position: Option<u32>,
    ) -> TournamentResult<()> {
        self.staged.registration_mut(registration_id)?.final_position = position;
        Ok(())
    }

    async fn next_elimination_seq(&mut self, tournament_id: TournamentId) -> TournamentResult<i64> {
        let last = self
            .staged
            .registrations
            .values()
            .filter(|r| r.tournament_id == tournament_id)
            .filter_map(|r| r.elimination_seq)
            .max()
            .unwrap_or(0);
        Ok(last + 1)
    }

    async fn write_settlement_result(
        &mut self,
        result: &RegistrationResult,
        write_points: bool,
    ) -> TournamentResult<()> {
        if self.fail_at == Some(self.settlement_writes) {
            return Err(TournamentError::Storage(format!(
                "injected failure writing registration {}",
                result.registration_id
            )));
        }
        self.settlement_writes += 1;

        let registration = self.staged.registration_mut(result.registration_id)?;
        registration.final_position = Some(result.final_position);
        registration.prize_amount = result.prize_amount;
        if write_points {
            registration.points_awarded = result.points_awarded;
        }
        Ok(())
    }

    async fn update_tournament(
        &mut self,
        id: TournamentId,
        change: &TournamentChange,
    ) -> TournamentResult<Tournament> {
        let tournament = self
            .staged
            .tournaments
            .get_mut(&id)
            .ok_or(TournamentError::NotFound(id))?;

        if let Some(status) = change.status {
            tournament.status = status;
        }
        tournament.prize_pool_locked |= change.lock_prize_pool;
        if let Some(manual) = change.manual_prize_pool {
            tournament.manual_prize_pool = manual;
        }
        tournament.updated_at = Utc::now();
        Ok(tournament.clone())
    }

    async fn record_activity(&mut self, entry: &NewActivity) -> TournamentResult<ActivityEntry> {
        let id = self.staged.next_id();
        let stored = ActivityEntry {
            id,
            tournament_id: entry.tournament_id,
            registration_id: entry.registration_id,
            kind: entry.kind,
            description: entry.description.clone(),
            created_at: Utc::now(),
        };
        self.staged.activity.push(stored.clone());
        Ok(stored)
    }

    async fn activity(
        &mut self,
        tournament_id: TournamentId,
        limit: i64,
    ) -> TournamentResult<Vec<ActivityEntry>> {
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(self
            .staged
            .activity
            .iter()
            .rev()
            .filter(|a| a.tournament_id == tournament_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn commit(&mut self) -> TournamentResult<()> {
        self.staged.check_final_positions()?;
        *self.guard = self.staged.clone();
        Ok(())
    }
}
