//! Prize pool resolution: gross revenue minus rake, or a manual override.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{rake::RakeBreakdown, revenue::RevenueTotals};
use crate::tournament::Tournament;

/// Resolved prize pool with the calculated value kept for audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizePool {
    pub gross: Decimal,
    pub rake: Decimal,
    /// Gross minus rake, whether or not it is used for payouts
    pub calculated: Decimal,
    /// Staff override; takes precedence when set
    pub manual: Option<Decimal>,
}

impl PrizePool {
    pub fn resolve(tournament: &Tournament, revenue: &RevenueTotals, rake: &RakeBreakdown) -> Self {
        let gross = revenue.gross();
        let total_rake = rake.total();

        Self {
            gross,
            rake: total_rake,
            calculated: gross - total_rake,
            manual: tournament.manual_prize_pool,
        }
    }

    /// Pool used for payouts
    pub fn distributable(&self) -> Decimal {
        self.manual.unwrap_or(self.calculated)
    }

    /// Whether anything will be paid out
    pub fn has_payouts(&self) -> bool {
        self.distributable() > Decimal::ZERO
    }

    pub fn is_overridden(&self) -> bool {
        self.manual.is_some()
    }
}
