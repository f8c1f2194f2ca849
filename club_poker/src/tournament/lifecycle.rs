//! Lifecycle rules: status transitions, the prize pool lock and the guards
//! that decide whether a requested change may be applied.
//!
//! Everything here is pure. Stores call these functions inside the write
//! transaction, after the tournament and registration rows are locked, so the
//! decision is always made against the committed state it will modify.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::activity::{ActivityKind, NewActivity};
use super::errors::{TournamentError, TournamentResult};
use super::models::{
    Registration, RegistrationId, RegistrationUpdate, Tournament, TournamentId, TournamentStatus,
    TournamentUpdate,
};

/// Whether `from → to` is a legal status change. Same-status updates are
/// handled as no-ops before this is consulted.
pub fn can_transition_to(from: TournamentStatus, to: TournamentStatus) -> bool {
    use TournamentStatus::*;

    matches!(
        (from, to),
        (Scheduled, Registration)
            | (Registration, InProgress)
            | (InProgress, Completed)
            | (InProgress, Registration)
            | (Scheduled | Registration | InProgress, Cancelled)
    )
}

/// Resolved tournament mutation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TournamentChange {
    pub status: Option<TournamentStatus>,
    pub lock_prize_pool: bool,
    /// `Some(None)` clears the override
    pub manual_prize_pool: Option<Option<Decimal>>,
    pub activity: Vec<NewActivity>,
}

impl TournamentChange {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && !self.lock_prize_pool && self.manual_prize_pool.is_none()
    }

    /// Status change to `completed` written by finalize
    pub(crate) fn completed(tournament: &Tournament, description: String) -> Self {
        Self {
            status: (tournament.status != TournamentStatus::Completed)
                .then_some(TournamentStatus::Completed),
            activity: vec![NewActivity::tournament(
                tournament.id,
                ActivityKind::Settlement,
                description,
            )],
            ..Default::default()
        }
    }
}

/// Validate a lifecycle update against the current tournament
pub fn plan_tournament_change(
    tournament: &Tournament,
    update: &TournamentUpdate,
) -> TournamentResult<TournamentChange> {
    let mut change = TournamentChange::default();

    if let Some(target) = update.status.filter(|target| *target != tournament.status) {
        if !can_transition_to(tournament.status, target) {
            return Err(TournamentError::InvalidTransition {
                from: tournament.status,
                to: target,
            });
        }
        change.status = Some(target);
        change.activity.push(NewActivity::tournament(
            tournament.id,
            ActivityKind::StatusChange,
            format!("Status changed from {} to {target}", tournament.status),
        ));
    }

    match update.prize_pool_locked {
        Some(false) if tournament.prize_pool_locked => {
            return Err(TournamentError::PoolLockIrreversible);
        }
        Some(true) if !tournament.prize_pool_locked => {
            change.lock_prize_pool = true;
            change.activity.push(NewActivity::tournament(
                tournament.id,
                ActivityKind::PoolLock,
                "Prize pool locked",
            ));
        }
        _ => {}
    }

    if update.clear_manual_prize_pool {
        if update.manual_prize_pool.is_some() {
            return Err(TournamentError::Validation(
                "cannot set and clear the manual prize pool at once".to_string(),
            ));
        }
        if tournament.manual_prize_pool.is_some() {
            change.manual_prize_pool = Some(None);
            change.activity.push(NewActivity::tournament(
                tournament.id,
                ActivityKind::ManualPrizePool,
                "Manual prize pool cleared",
            ));
        }
    } else if let Some(amount) = update.manual_prize_pool {
        if amount < Decimal::ZERO {
            return Err(TournamentError::Validation(
                "manual prize pool must not be negative".to_string(),
            ));
        }
        if tournament.manual_prize_pool != Some(amount) {
            change.manual_prize_pool = Some(Some(amount));
            change.activity.push(NewActivity::tournament(
                tournament.id,
                ActivityKind::ManualPrizePool,
                format!("Manual prize pool set to {amount}"),
            ));
        }
    }

    Ok(change)
}

/// New registrations need an open, unlocked tournament
pub fn ensure_can_register(tournament: &Tournament) -> TournamentResult<()> {
    if tournament.status.is_terminal() {
        return Err(TournamentError::invalid_state(
            "register a player",
            tournament.status,
        ));
    }
    if tournament.prize_pool_locked {
        return Err(TournamentError::locked("register a player"));
    }
    Ok(())
}

/// Finalize runs on a tournament in play, or re-runs on a completed one
pub fn ensure_can_finalize(tournament: &Tournament) -> TournamentResult<()> {
    match tournament.status {
        TournamentStatus::InProgress | TournamentStatus::Completed => Ok(()),
        other => Err(TournamentError::invalid_state("finalize", other)),
    }
}

/// Elimination details resolved for writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elimination {
    pub at: DateTime<Utc>,
    pub eliminated_by: Option<RegistrationId>,
    /// Registrations still in when this one busted, itself included
    pub provisional_position: u32,
    pub seq: i64,
}

/// Resolved registration mutation. Counters are deltas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationChange {
    pub registration_id: RegistrationId,
    pub add_rebuys: u32,
    pub add_addons: u32,
    pub add_knockouts: u32,
    pub elimination: Option<Elimination>,
    pub entering_high_hands: Option<bool>,
    pub high_hand_winner: Option<bool>,
    /// `Some(None)` clears the award
    pub high_hand_amount: Option<Option<Decimal>>,
    pub activity: Vec<NewActivity>,
}

impl RegistrationChange {
    pub fn is_empty(&self) -> bool {
        self.add_rebuys == 0
            && self.add_addons == 0
            && self.add_knockouts == 0
            && self.elimination.is_none()
            && self.entering_high_hands.is_none()
            && self.high_hand_winner.is_none()
            && self.high_hand_amount.is_none()
    }

    /// Knockout credited to the registration that busted `eliminated`
    pub fn knockout_credit(knocker: &Registration, eliminated: &Registration) -> Self {
        Self {
            registration_id: knocker.id,
            add_knockouts: 1,
            activity: vec![NewActivity::registration(
                knocker.tournament_id,
                knocker.id,
                ActivityKind::Knockout,
                format!(
                    "Player {} knocked out player {}",
                    knocker.player_id, eliminated.player_id
                ),
            )],
            ..Default::default()
        }
    }
}

/// State a registration update is checked against, read inside the transaction
#[derive(Debug, Clone, Copy)]
pub struct RegistrationContext<'a> {
    /// Registrations not yet eliminated, before this update
    pub active_registrations: u32,
    pub next_elimination_seq: i64,
    pub knocker: Option<&'a Registration>,
    /// Default award for a high-hand winner
    pub high_hand_share: Option<Decimal>,
    pub now: DateTime<Utc>,
}

/// Validate a registration update against the lock and status rules
pub fn plan_registration_change(
    tournament: &Tournament,
    registration: &Registration,
    update: &RegistrationUpdate,
    context: &RegistrationContext<'_>,
) -> TournamentResult<RegistrationChange> {
    if tournament.status == TournamentStatus::Cancelled {
        return Err(TournamentError::invalid_state(
            "update a registration",
            tournament.status,
        ));
    }

    // Settled rows only accept high-hand award corrections
    if tournament.status == TournamentStatus::Completed
        && (update.add_rebuys > 0
            || update.add_addons > 0
            || update.add_knockouts > 0
            || update.eliminate.is_some()
            || update
                .entering_high_hands
                .is_some_and(|entering| entering != registration.entering_high_hands))
    {
        return Err(TournamentError::invalid_state(
            "change a settled registration",
            tournament.status,
        ));
    }

    let locked = tournament.prize_pool_locked;
    if locked && update.add_rebuys > 0 {
        return Err(TournamentError::locked("add a rebuy"));
    }
    if locked && update.add_addons > 0 {
        return Err(TournamentError::locked("add an add-on"));
    }
    if locked
        && update
            .entering_high_hands
            .is_some_and(|entering| entering != registration.entering_high_hands)
    {
        return Err(TournamentError::locked("change high-hand entries"));
    }

    let tid = tournament.id;
    let rid = registration.id;
    let mut change = RegistrationChange {
        registration_id: rid,
        add_rebuys: update.add_rebuys,
        add_addons: update.add_addons,
        add_knockouts: update.add_knockouts,
        ..Default::default()
    };

    if update.add_rebuys > 0 {
        change.activity.push(NewActivity::registration(
            tid,
            rid,
            ActivityKind::Rebuy,
            format!("Player {} rebought x{}", registration.player_id, update.add_rebuys),
        ));
    }
    if update.add_addons > 0 {
        change.activity.push(NewActivity::registration(
            tid,
            rid,
            ActivityKind::Addon,
            format!("Player {} took add-on x{}", registration.player_id, update.add_addons),
        ));
    }
    if update.add_knockouts > 0 {
        change.activity.push(NewActivity::registration(
            tid,
            rid,
            ActivityKind::Knockout,
            format!(
                "Player {} credited with {} knockout(s)",
                registration.player_id, update.add_knockouts
            ),
        ));
    }

    if let Some(request) = &update.eliminate {
        change.elimination = Some(plan_elimination(
            tid,
            registration,
            request.eliminated_by,
            request.at.unwrap_or(context.now),
            context,
            &mut change.activity,
        )?);
    }

    if let Some(entering) = update
        .entering_high_hands
        .filter(|entering| *entering != registration.entering_high_hands)
    {
        if entering && tournament.high_hand.is_none() {
            return Err(TournamentError::Validation(
                "tournament has no high-hand pool".to_string(),
            ));
        }
        change.entering_high_hands = Some(entering);
        let verb = if entering { "entered" } else { "left" };
        change.activity.push(NewActivity::registration(
            tid,
            rid,
            ActivityKind::HighHandEntry,
            format!("Player {} {verb} the high-hand pool", registration.player_id),
        ));
    }

    plan_high_hand_award(tournament, registration, update, context, &mut change)?;

    Ok(change)
}

fn plan_elimination(
    tournament_id: TournamentId,
    registration: &Registration,
    eliminated_by: Option<RegistrationId>,
    at: DateTime<Utc>,
    context: &RegistrationContext<'_>,
    activity: &mut Vec<NewActivity>,
) -> TournamentResult<Elimination> {
    if registration.is_eliminated {
        return Err(TournamentError::Validation(format!(
            "registration {} is already eliminated",
            registration.id
        )));
    }

    if let Some(knocker_id) = eliminated_by {
        if knocker_id == registration.id {
            return Err(TournamentError::Validation(
                "a player cannot knock themselves out".to_string(),
            ));
        }
        match context.knocker {
            Some(knocker) if knocker.id == knocker_id && knocker.tournament_id == tournament_id => {}
            Some(_) => {
                return Err(TournamentError::Validation(format!(
                    "registration {knocker_id} is not in tournament {tournament_id}"
                )));
            }
            None => return Err(TournamentError::RegistrationNotFound(knocker_id)),
        }
    }

    let provisional_position = context.active_registrations.max(1);
    let description = match context.knocker {
        Some(knocker) => format!(
            "Player {} eliminated in {} place by player {}",
            registration.player_id,
            ordinal(provisional_position),
            knocker.player_id
        ),
        None => format!(
            "Player {} eliminated in {} place",
            registration.player_id,
            ordinal(provisional_position)
        ),
    };
    activity.push(NewActivity::registration(
        tournament_id,
        registration.id,
        ActivityKind::Elimination,
        description,
    ));

    Ok(Elimination {
        at,
        eliminated_by,
        provisional_position,
        seq: context.next_elimination_seq,
    })
}

fn plan_high_hand_award(
    tournament: &Tournament,
    registration: &Registration,
    update: &RegistrationUpdate,
    context: &RegistrationContext<'_>,
    change: &mut RegistrationChange,
) -> TournamentResult<()> {
    if update.high_hand_amount.is_some_and(|amount| amount < Decimal::ZERO) {
        return Err(TournamentError::Validation(
            "high-hand amount must not be negative".to_string(),
        ));
    }

    match update.high_hand_winner {
        Some(true) => {
            if tournament.high_hand.is_none() {
                return Err(TournamentError::Validation(
                    "tournament has no high-hand pool".to_string(),
                ));
            }
            let entered = change
                .entering_high_hands
                .unwrap_or(registration.entering_high_hands);
            if !entered {
                return Err(TournamentError::Validation(format!(
                    "player {} is not entered in the high-hand pool",
                    registration.player_id
                )));
            }
            let amount = update
                .high_hand_amount
                .or(context.high_hand_share)
                .unwrap_or(Decimal::ZERO);
            change.high_hand_winner = Some(true);
            change.high_hand_amount = Some(Some(amount));
            change.activity.push(NewActivity::registration(
                tournament.id,
                registration.id,
                ActivityKind::HighHandAward,
                format!(
                    "Player {} awarded high hand ({amount})",
                    registration.player_id
                ),
            ));
        }
        Some(false) => {
            if registration.high_hand_winner {
                change.high_hand_winner = Some(false);
                change.high_hand_amount = Some(None);
                change.activity.push(NewActivity::registration(
                    tournament.id,
                    registration.id,
                    ActivityKind::HighHandAward,
                    format!("High-hand award removed from player {}", registration.player_id),
                ));
            }
        }
        None => {
            // Amount correction on an existing winner
            if let Some(amount) = update.high_hand_amount {
                if !registration.high_hand_winner {
                    return Err(TournamentError::Validation(
                        "high-hand amount requires a high-hand winner".to_string(),
                    ));
                }
                change.high_hand_amount = Some(Some(amount));
                change.activity.push(NewActivity::registration(
                    tournament.id,
                    registration.id,
                    ActivityKind::HighHandAward,
                    format!(
                        "High-hand award for player {} set to {amount}",
                        registration.player_id
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// `1st`, `2nd`, `3rd`, `11th`, `22nd`
pub(crate) fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
