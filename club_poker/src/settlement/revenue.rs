//! Revenue aggregation over a tournament's registrations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tournament::{Registration, Tournament};

/// Unit counts and dollar totals for the three chargeable streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RevenueTotals {
    pub buy_ins: u32,
    pub rebuys: u32,
    pub addons: u32,
    pub buy_in_total: Decimal,
    pub rebuy_total: Decimal,
    pub addon_total: Decimal,
}

impl RevenueTotals {
    /// Sum current registration counters. A missing stream price counts as zero.
    pub fn aggregate(tournament: &Tournament, registrations: &[Registration]) -> Self {
        let (buy_ins, rebuys, addons) =
            registrations
                .iter()
                .fold((0u32, 0u32, 0u32), |(b, r, a), reg| {
                    (
                        b.saturating_add(reg.buy_ins),
                        r.saturating_add(reg.rebuys),
                        a.saturating_add(reg.addons),
                    )
                });

        Self {
            buy_ins,
            rebuys,
            addons,
            buy_in_total: Decimal::from(buy_ins) * tournament.buy_in_amount,
            rebuy_total: Decimal::from(rebuys) * tournament.rebuy_amount.unwrap_or_default(),
            addon_total: Decimal::from(addons) * tournament.addon_amount.unwrap_or_default(),
        }
    }

    /// Sum of the three stream totals
    pub fn gross(&self) -> Decimal {
        self.buy_in_total + self.rebuy_total + self.addon_total
    }
}
