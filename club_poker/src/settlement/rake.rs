//! Per-stream rake policies.
//!
//! Buy-ins, rebuys and add-ons each carry their own policy, so a club can take
//! a flat fee on buy-ins while leaving add-ons commission free.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::revenue::RevenueTotals;
use crate::tournament::{Tournament, TournamentError, TournamentResult};

/// How rake is taken from a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RakeType {
    #[default]
    None,
    /// `amount` is a percentage of the stream total
    Percentage,
    /// `amount` is charged per unit (per entry), not once per tournament
    Fixed,
}

impl RakeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RakeType::None => "none",
            RakeType::Percentage => "percentage",
            RakeType::Fixed => "fixed",
        }
    }
}

impl std::fmt::Display for RakeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rake policy for one revenue stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct RakePolicy {
    #[serde(rename = "type")]
    pub rake_type: RakeType,
    #[serde(default)]
    pub amount: Decimal,
}

impl RakePolicy {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn percentage(percent: Decimal) -> Self {
        Self {
            rake_type: RakeType::Percentage,
            amount: percent,
        }
    }

    pub fn fixed(per_unit: Decimal) -> Self {
        Self {
            rake_type: RakeType::Fixed,
            amount: per_unit,
        }
    }

    /// Rake owed on a stream of `units` entries totalling `stream_total`
    pub fn rake_for(&self, units: u32, stream_total: Decimal) -> Decimal {
        match self.rake_type {
            RakeType::None => Decimal::ZERO,
            RakeType::Percentage => stream_total * self.amount / Decimal::ONE_HUNDRED,
            RakeType::Fixed => Decimal::from(units) * self.amount,
        }
    }

    pub(crate) fn validate(&self, stream: &str) -> TournamentResult<()> {
        if self.amount < Decimal::ZERO {
            return Err(TournamentError::Validation(format!(
                "{stream} rake must not be negative"
            )));
        }
        if self.rake_type == RakeType::Percentage && self.amount > Decimal::ONE_HUNDRED {
            return Err(TournamentError::Validation(format!(
                "{stream} rake percentage must be at most 100"
            )));
        }
        Ok(())
    }
}

/// Rake taken from each stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RakeBreakdown {
    pub buy_in: Decimal,
    pub rebuy: Decimal,
    pub addon: Decimal,
}

impl RakeBreakdown {
    /// Apply each stream's policy independently
    pub fn calculate(tournament: &Tournament, revenue: &RevenueTotals) -> Self {
        Self {
            buy_in: tournament
                .buy_in_rake
                .rake_for(revenue.buy_ins, revenue.buy_in_total),
            rebuy: tournament
                .rebuy_rake
                .rake_for(revenue.rebuys, revenue.rebuy_total),
            addon: tournament
                .addon_rake
                .rake_for(revenue.addons, revenue.addon_total),
        }
    }

    pub fn total(&self) -> Decimal {
        self.buy_in + self.rebuy + self.addon
    }
}
