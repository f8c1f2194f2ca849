//! Tournament activity log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::errors::TournamentError;
use super::models::{RegistrationId, TournamentId};

/// What an activity entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Registration,
    Rebuy,
    Addon,
    Elimination,
    Knockout,
    HighHandEntry,
    HighHandAward,
    StatusChange,
    PoolLock,
    ManualPrizePool,
    Settlement,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Registration => "registration",
            ActivityKind::Rebuy => "rebuy",
            ActivityKind::Addon => "addon",
            ActivityKind::Elimination => "elimination",
            ActivityKind::Knockout => "knockout",
            ActivityKind::HighHandEntry => "high_hand_entry",
            ActivityKind::HighHandAward => "high_hand_award",
            ActivityKind::StatusChange => "status_change",
            ActivityKind::PoolLock => "pool_lock",
            ActivityKind::ManualPrizePool => "manual_prize_pool",
            ActivityKind::Settlement => "settlement",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "registration" => ActivityKind::Registration,
            "rebuy" => ActivityKind::Rebuy,
            "addon" => ActivityKind::Addon,
            "elimination" => ActivityKind::Elimination,
            "knockout" => ActivityKind::Knockout,
            "high_hand_entry" => ActivityKind::HighHandEntry,
            "high_hand_award" => ActivityKind::HighHandAward,
            "status_change" => ActivityKind::StatusChange,
            "pool_lock" => ActivityKind::PoolLock,
            "manual_prize_pool" => ActivityKind::ManualPrizePool,
            "settlement" => ActivityKind::Settlement,
            other => {
                return Err(TournamentError::Validation(format!(
                    "unknown activity kind '{other}'"
                )));
            }
        };
        Ok(kind)
    }
}

/// Stored activity entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub tournament_id: TournamentId,
    pub registration_id: Option<RegistrationId>,
    pub kind: ActivityKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Activity entry waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub tournament_id: TournamentId,
    pub registration_id: Option<RegistrationId>,
    pub kind: ActivityKind,
    pub description: String,
}

impl NewActivity {
    pub fn tournament(
        tournament_id: TournamentId,
        kind: ActivityKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            tournament_id,
            registration_id: None,
            kind,
            description: description.into(),
        }
    }

    pub fn registration(
        tournament_id: TournamentId,
        registration_id: RegistrationId,
        kind: ActivityKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            tournament_id,
            registration_id: Some(registration_id),
            kind,
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_parse_back() {
        for kind in [
            ActivityKind::Registration,
            ActivityKind::HighHandEntry,
            ActivityKind::ManualPrizePool,
            ActivityKind::Settlement,
        ] {
            assert_eq!(kind.as_str().parse::<ActivityKind>().unwrap(), kind);
        }
        assert!("payout".parse::<ActivityKind>().is_err());
    }
}
