//! High-hand side pool.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::rake::RakePolicy;
use crate::tournament::{Registration, TournamentError, TournamentResult};

/// High-hand side pool configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HighHandConfig {
    /// Entry fee per participating registration
    pub amount: Decimal,
    #[serde(default)]
    pub rake: RakePolicy,
    /// Number of winners the net pool is split between
    pub payout_count: u32,
}

impl HighHandConfig {
    pub(crate) fn validate(&self) -> TournamentResult<()> {
        if self.amount < Decimal::ZERO {
            return Err(TournamentError::Validation(
                "high-hand amount must not be negative".to_string(),
            ));
        }
        if self.payout_count == 0 {
            return Err(TournamentError::Validation(
                "high-hand payout count must be at least 1".to_string(),
            ));
        }
        self.rake.validate("high-hand")
    }
}

/// Computed high-hand pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighHandSummary {
    pub entrants: u32,
    pub gross: Decimal,
    pub rake: Decimal,
    pub net: Decimal,
    pub payout_count: u32,
    /// Share of the net pool for each winner, to the cent
    pub per_winner: Decimal,
    /// Amount already awarded to winners
    pub awarded: Decimal,
}

impl HighHandSummary {
    pub fn compute(config: &HighHandConfig, registrations: &[Registration]) -> Self {
        let entrants = u32::try_from(
            registrations
                .iter()
                .filter(|r| r.entering_high_hands)
                .count(),
        )
        .unwrap_or(u32::MAX);
        let gross = Decimal::from(entrants) * config.amount;
        let rake = config.rake.rake_for(entrants, gross);
        let net = (gross - rake).max(Decimal::ZERO);
        let per_winner = if config.payout_count == 0 {
            Decimal::ZERO
        } else {
            (net / Decimal::from(config.payout_count))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };
        let awarded = registrations
            .iter()
            .filter(|r| r.high_hand_winner)
            .filter_map(|r| r.high_hand_amount)
            .sum();

        Self {
            entrants,
            gross,
            rake,
            net,
            payout_count: config.payout_count,
            per_winner,
            awarded,
        }
    }
}
