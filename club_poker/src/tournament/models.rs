//! Tournament and registration data models.

use crate::settlement::{HighHandConfig, PayoutStructure, RakePolicy, RakeType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::errors::{TournamentError, TournamentResult};

/// Tournament ID type
pub type TournamentId = i64;

/// Registration ID type
pub type RegistrationId = i64;

/// Player ID type
pub type PlayerId = i64;

/// Tournament status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Announced, not yet open
    Scheduled,
    /// Accepting registrations (also the paused state)
    Registration,
    /// Cards in the air
    InProgress,
    /// Settled
    Completed,
    /// Called off before completion
    Cancelled,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Scheduled => "scheduled",
            TournamentStatus::Registration => "registration",
            TournamentStatus::InProgress => "in_progress",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled tournaments never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TournamentStatus::Completed | TournamentStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TournamentStatus {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(TournamentStatus::Scheduled),
            "registration" => Ok(TournamentStatus::Registration),
            "in_progress" => Ok(TournamentStatus::InProgress),
            "completed" => Ok(TournamentStatus::Completed),
            "cancelled" => Ok(TournamentStatus::Cancelled),
            other => Err(TournamentError::Validation(format!(
                "unknown tournament status '{other}'"
            ))),
        }
    }
}

/// Tournament record as the settlement engine sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub club_id: i64,
    pub season_id: Option<i64>,
    pub name: String,
    pub buy_in_amount: Decimal,
    pub rebuy_amount: Option<Decimal>,
    pub addon_amount: Option<Decimal>,
    pub buy_in_rake: RakePolicy,
    pub rebuy_rake: RakePolicy,
    pub addon_rake: RakePolicy,
    pub payout_structure: PayoutStructure,
    pub track_points: bool,
    pub points_system_id: Option<i64>,
    pub status: TournamentStatus,
    /// One-way: once true it never reverts
    pub prize_pool_locked: bool,
    pub manual_prize_pool: Option<Decimal>,
    pub high_hand: Option<HighHandConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tournament configuration as submitted by the club management layer.
///
/// The payout structure arrives as a free-form name and is parsed strictly
/// here, so unknown names fail at creation rather than at settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTournament {
    pub club_id: i64,
    pub season_id: Option<i64>,
    pub name: String,
    pub buy_in_amount: Decimal,
    pub rebuy_amount: Option<Decimal>,
    pub addon_amount: Option<Decimal>,
    #[serde(default)]
    pub buy_in_rake: RakePolicy,
    #[serde(default)]
    pub rebuy_rake: RakePolicy,
    #[serde(default)]
    pub addon_rake: RakePolicy,
    pub payout_structure: String,
    /// Only read when `payout_structure` is `custom`
    pub payout_percentages: Option<Vec<Decimal>>,
    #[serde(default)]
    pub track_points: bool,
    pub points_system_id: Option<i64>,
    pub high_hand: Option<HighHandConfig>,
}

impl NewTournament {
    /// Create a minimal configuration with a buy-in and the standard payout table
    pub fn new(club_id: i64, name: impl Into<String>, buy_in_amount: Decimal) -> Self {
        Self {
            club_id,
            season_id: None,
            name: name.into(),
            buy_in_amount,
            rebuy_amount: None,
            addon_amount: None,
            buy_in_rake: RakePolicy::none(),
            rebuy_rake: RakePolicy::none(),
            addon_rake: RakePolicy::none(),
            payout_structure: "standard".to_string(),
            payout_percentages: None,
            track_points: false,
            points_system_id: None,
            high_hand: None,
        }
    }

    /// Validate the configuration and resolve the payout structure
    pub fn validate(&self) -> TournamentResult<PayoutStructure> {
        if self.name.trim().is_empty() {
            return Err(TournamentError::Validation(
                "tournament name must not be empty".to_string(),
            ));
        }

        check_amount("buy_in_amount", Some(self.buy_in_amount))?;
        check_amount("rebuy_amount", self.rebuy_amount)?;
        check_amount("addon_amount", self.addon_amount)?;

        for (stream, policy) in [
            ("buy-in", &self.buy_in_rake),
            ("rebuy", &self.rebuy_rake),
            ("add-on", &self.addon_rake),
        ] {
            policy.validate(stream)?;
        }

        if let Some(high_hand) = &self.high_hand {
            high_hand.validate()?;
        }

        if self.track_points && self.points_system_id.is_none() {
            return Err(TournamentError::Validation(
                "track_points requires a points system".to_string(),
            ));
        }

        let structure = PayoutStructure::from_str(&self.payout_structure)?;
        match structure {
            PayoutStructure::Custom(_) => {
                let percentages = self.payout_percentages.clone().ok_or_else(|| {
                    TournamentError::InvalidPayoutStructure(
                        "custom structure requires percentages".to_string(),
                    )
                })?;
                PayoutStructure::custom(percentages)
            }
            named => Ok(named),
        }
    }
}

impl Tournament {
    /// Build a scheduled tournament from a validated configuration
    pub fn new(id: TournamentId, config: &NewTournament) -> TournamentResult<Self> {
        let payout_structure = config.validate()?;
        let now = Utc::now();

        Ok(Self {
            id,
            club_id: config.club_id,
            season_id: config.season_id,
            name: config.name.clone(),
            buy_in_amount: config.buy_in_amount,
            rebuy_amount: config.rebuy_amount,
            addon_amount: config.addon_amount,
            buy_in_rake: config.buy_in_rake,
            rebuy_rake: config.rebuy_rake,
            addon_rake: config.addon_rake,
            payout_structure,
            track_points: config.track_points,
            points_system_id: config.points_system_id,
            status: TournamentStatus::Scheduled,
            prize_pool_locked: false,
            manual_prize_pool: None,
            high_hand: config.high_hand,
            created_at: now,
            updated_at: now,
        })
    }
}

fn check_amount(field: &str, amount: Option<Decimal>) -> TournamentResult<()> {
    match amount {
        Some(value) if value < Decimal::ZERO => Err(
            TournamentError::Validation(format!("{field} must not be negative")),
        ),
        _ => Ok(()),
    }
}

/// Player registration in a tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub buy_ins: u32,
    pub rebuys: u32,
    pub addons: u32,
    pub is_eliminated: bool,
    pub elimination_time: Option<DateTime<Utc>>,
    /// Registration that knocked this player out
    pub eliminated_by: Option<RegistrationId>,
    /// Order in which eliminations were recorded within the tournament
    pub elimination_seq: Option<i64>,
    pub knockouts: u32,
    pub final_position: Option<u32>,
    pub prize_amount: Option<Decimal>,
    pub points_awarded: Option<i32>,
    pub entering_high_hands: bool,
    pub high_hand_winner: bool,
    pub high_hand_amount: Option<Decimal>,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    /// Fresh registration with a single buy-in
    pub fn new(id: RegistrationId, tournament_id: TournamentId, player_id: PlayerId) -> Self {
        Self {
            id,
            tournament_id,
            player_id,
            buy_ins: 1,
            rebuys: 0,
            addons: 0,
            is_eliminated: false,
            elimination_time: None,
            eliminated_by: None,
            elimination_seq: None,
            knockouts: 0,
            final_position: None,
            prize_amount: None,
            points_awarded: None,
            entering_high_hands: false,
            high_hand_winner: false,
            high_hand_amount: None,
            registered_at: Utc::now(),
        }
    }
}

/// Lifecycle update requested by staff
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TournamentUpdate {
    pub status: Option<TournamentStatus>,
    pub prize_pool_locked: Option<bool>,
    pub manual_prize_pool: Option<Decimal>,
    #[serde(default)]
    pub clear_manual_prize_pool: bool,
}

/// Elimination details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EliminationRequest {
    /// Registration credited with the knockout
    pub eliminated_by: Option<RegistrationId>,
    /// Defaults to now
    pub at: Option<DateTime<Utc>>,
}

/// Registration update requested by staff.
///
/// Counters are deltas so concurrent confirmations never overwrite each other.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationUpdate {
    #[serde(default)]
    pub add_rebuys: u32,
    #[serde(default)]
    pub add_addons: u32,
    #[serde(default)]
    pub add_knockouts: u32,
    pub eliminate: Option<EliminationRequest>,
    pub entering_high_hands: Option<bool>,
    pub high_hand_winner: Option<bool>,
    pub high_hand_amount: Option<Decimal>,
}

impl RegistrationUpdate {
    pub fn is_empty(&self) -> bool {
        self.add_rebuys == 0
            && self.add_addons == 0
            && self.add_knockouts == 0
            && self.eliminate.is_none()
            && self.entering_high_hands.is_none()
            && self.high_hand_winner.is_none()
            && self.high_hand_amount.is_none()
    }
}

/// Convenience for the rake type column
pub(crate) fn rake_type_from_str(s: &str) -> TournamentResult<RakeType> {
    match s {
        "none" => Ok(RakeType::None),
        "percentage" => Ok(RakeType::Percentage),
        "fixed" => Ok(RakeType::Fixed),
        other => Err(TournamentError::Validation(format!(
            "unknown rake type '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_str() {
        for status in [
            TournamentStatus::Scheduled,
            TournamentStatus::Registration,
            TournamentStatus::InProgress,
            TournamentStatus::Completed,
            TournamentStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<TournamentStatus>().unwrap(), status);
        }
        assert!("finished".parse::<TournamentStatus>().is_err());
    }

    #[test]
    fn test_new_tournament_rejects_unknown_payout_name() {
        let mut config = NewTournament::new(1, "Friday Freezeout", Decimal::from(50));
        config.payout_structure = "unknown-name".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, TournamentError::InvalidPayoutStructure(_)));
    }

    #[test]
    fn test_new_tournament_custom_requires_percentages() {
        let mut config = NewTournament::new(1, "Custom", Decimal::from(20));
        config.payout_structure = "custom".to_string();
        assert!(config.validate().is_err());

        config.payout_percentages = Some(vec![Decimal::from(70), Decimal::from(30)]);
        let structure = config.validate().unwrap();
        assert_eq!(structure.places(), 2);
    }

    #[test]
    fn test_new_tournament_rejects_negative_amounts() {
        let mut config = NewTournament::new(1, "Neg", Decimal::from(20));
        config.rebuy_amount = Some(Decimal::from(-5));
        assert!(matches!(
            config.validate(),
            Err(TournamentError::Validation(_))
        ));
    }

    #[test]
    fn test_track_points_requires_system() {
        let mut config = NewTournament::new(1, "League Night", Decimal::from(20));
        config.track_points = true;
        assert!(config.validate().is_err());

        config.points_system_id = Some(3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_registration_update_is_empty() {
        assert!(RegistrationUpdate::default().is_empty());
        let update = RegistrationUpdate {
            add_rebuys: 1,
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
