//! Payout tables and per-position prize distribution.

use log::warn;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::tournament::{TournamentError, TournamentResult};

// Tenths of a percent
const STANDARD: [u32; 3] = [500, 300, 200];
const TOP_4: [u32; 4] = [450, 270, 170, 110];
const TOP_5: [u32; 5] = [400, 250, 150, 120, 80];
const TOP_6: [u32; 6] = [350, 220, 150, 120, 90, 70];
const TOP_9: [u32; 9] = [300, 200, 130, 100, 80, 65, 50, 40, 35];

/// Supported payout structures
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStructure {
    /// 50 / 30 / 20
    #[default]
    Standard,
    Top4,
    Top5,
    Top6,
    Top9,
    /// Club-defined percentages, summing to 100
    Custom(Vec<Decimal>),
}

impl PayoutStructure {
    /// Validated custom structure
    pub fn custom(percentages: Vec<Decimal>) -> TournamentResult<Self> {
        if percentages.is_empty() {
            return Err(TournamentError::InvalidPayoutStructure(
                "custom structure needs at least one place".to_string(),
            ));
        }
        if percentages.iter().any(|p| *p < Decimal::ZERO) {
            return Err(TournamentError::InvalidPayoutStructure(
                "percentages must not be negative".to_string(),
            ));
        }
        let sum: Decimal = percentages.iter().sum();
        if sum != Decimal::ONE_HUNDRED {
            return Err(TournamentError::InvalidPayoutStructure(format!(
                "percentages sum to {sum}, expected 100"
            )));
        }
        Ok(PayoutStructure::Custom(percentages))
    }

    /// Resolve a stored name, falling back to the standard table for names
    /// that predate the closed set of structures
    pub fn resolve_lenient(name: &str, percentages: Option<Vec<Decimal>>) -> Self {
        let parsed = match PayoutStructure::from_str(name) {
            Ok(PayoutStructure::Custom(_)) => percentages
                .ok_or_else(|| {
                    TournamentError::InvalidPayoutStructure("missing percentages".to_string())
                })
                .and_then(PayoutStructure::custom),
            other => other,
        };

        parsed.unwrap_or_else(|err| {
            warn!("Payout structure '{name}' unusable ({err}), using standard table");
            PayoutStructure::Standard
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            PayoutStructure::Standard => "standard",
            PayoutStructure::Top4 => "top4",
            PayoutStructure::Top5 => "top5",
            PayoutStructure::Top6 => "top6",
            PayoutStructure::Top9 => "top9",
            PayoutStructure::Custom(_) => "custom",
        }
    }

    /// Percentages per place, 1st first
    pub fn percentages(&self) -> Vec<Decimal> {
        let tenths: &[u32] = match self {
            PayoutStructure::Standard => &STANDARD,
            PayoutStructure::Top4 => &TOP_4,
            PayoutStructure::Top5 => &TOP_5,
            PayoutStructure::Top6 => &TOP_6,
            PayoutStructure::Top9 => &TOP_9,
            PayoutStructure::Custom(percentages) => return percentages.clone(),
        };
        tenths
            .iter()
            .map(|t| Decimal::new(i64::from(*t), 1))
            .collect()
    }

    /// Number of paid places
    pub fn places(&self) -> usize {
        match self {
            PayoutStructure::Custom(percentages) => percentages.len(),
            _ => self.percentages().len(),
        }
    }

    /// Split `pool` across the paid places
    pub fn distribute(&self, pool: Decimal) -> PrizeStructure {
        if pool <= Decimal::ZERO {
            return PrizeStructure {
                total_pool: pool,
                payouts: Vec::new(),
            };
        }

        let payouts = self
            .percentages()
            .iter()
            .map(|pct| {
                (pool * *pct / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            })
            .collect();

        PrizeStructure {
            total_pool: pool,
            payouts,
        }
    }
}

impl FromStr for PayoutStructure {
    type Err = TournamentError;

    /// Strict parse. `custom` yields an empty table that the caller fills in.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(PayoutStructure::Standard),
            "top4" => Ok(PayoutStructure::Top4),
            "top5" => Ok(PayoutStructure::Top5),
            "top6" => Ok(PayoutStructure::Top6),
            "top9" => Ok(PayoutStructure::Top9),
            "custom" => Ok(PayoutStructure::Custom(Vec::new())),
            other => Err(TournamentError::InvalidPayoutStructure(format!(
                "unknown payout structure '{other}'"
            ))),
        }
    }
}

/// Prize amounts for a given pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeStructure {
    /// Pool the payouts were computed from
    pub total_pool: Decimal,
    /// Payouts by position (1st, 2nd, 3rd, etc.)
    pub payouts: Vec<Decimal>,
}

impl PrizeStructure {
    /// Get payout for a specific position (1-indexed)
    pub fn payout_for_position(&self, position: usize) -> Option<Decimal> {
        if position == 0 || position > self.payouts.len() {
            None
        } else {
            Some(self.payouts[position - 1])
        }
    }

    /// Sum of rounded payouts; may differ from the pool by rounding slack
    pub fn total_paid(&self) -> Decimal {
        self.payouts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_sum_to_hundred() {
        for structure in [
            PayoutStructure::Standard,
            PayoutStructure::Top4,
            PayoutStructure::Top5,
            PayoutStructure::Top6,
            PayoutStructure::Top9,
        ] {
            let sum: Decimal = structure.percentages().iter().sum();
            assert_eq!(sum, Decimal::ONE_HUNDRED, "{} does not sum to 100", structure.name());
        }
    }

    #[test]
    fn test_builtin_place_counts() {
        assert_eq!(PayoutStructure::Standard.places(), 3);
        assert_eq!(PayoutStructure::Top4.places(), 4);
        assert_eq!(PayoutStructure::Top5.places(), 5);
        assert_eq!(PayoutStructure::Top6.places(), 6);
        assert_eq!(PayoutStructure::Top9.places(), 9);
    }

    #[test]
    fn test_standard_distribution() {
        let prizes = PayoutStructure::Standard.distribute(Decimal::from(360));
        assert_eq!(
            prizes.payouts,
            vec![Decimal::from(180), Decimal::from(108), Decimal::from(72)]
        );
        assert_eq!(prizes.payout_for_position(1), Some(Decimal::from(180)));
        assert_eq!(prizes.payout_for_position(4), None);
        assert_eq!(prizes.payout_for_position(0), None);
    }

    #[test]
    fn test_rounding_is_half_away_from_zero() {
        // 45% of 10 = 4.5 -> 5, 27% of 10 = 2.7 -> 3, 17% -> 1.7 -> 2, 11% -> 1.1 -> 1
        let prizes = PayoutStructure::Top4.distribute(Decimal::from(10));
        assert_eq!(
            prizes.payouts,
            vec![
                Decimal::from(5),
                Decimal::from(3),
                Decimal::from(2),
                Decimal::from(1)
            ]
        );
        // Slack is accepted
        assert_eq!(prizes.total_paid(), Decimal::from(11));
    }

    #[test]
    fn test_non_positive_pool_pays_nothing() {
        assert!(PayoutStructure::Top9.distribute(Decimal::ZERO).payouts.is_empty());
        assert!(PayoutStructure::Standard.distribute(Decimal::from(-40)).payouts.is_empty());
    }

    #[test]
    fn test_strict_parse_rejects_unknown() {
        assert_eq!("Top5".parse::<PayoutStructure>().unwrap(), PayoutStructure::Top5);
        assert!("unknown-name".parse::<PayoutStructure>().is_err());
    }

    #[test]
    fn test_lenient_resolution_falls_back_to_standard() {
        assert_eq!(
            PayoutStructure::resolve_lenient("unknown-name", None),
            PayoutStructure::Standard
        );
        assert_eq!(
            PayoutStructure::resolve_lenient("custom", None),
            PayoutStructure::Standard
        );
        assert_eq!(
            PayoutStructure::resolve_lenient("top6", None),
            PayoutStructure::Top6
        );
    }

    #[test]
    fn test_custom_validation() {
        assert!(PayoutStructure::custom(vec![]).is_err());
        assert!(PayoutStructure::custom(vec![Decimal::from(60), Decimal::from(30)]).is_err());
        assert!(PayoutStructure::custom(vec![Decimal::from(110), Decimal::from(-10)]).is_err());

        let custom =
            PayoutStructure::custom(vec![Decimal::from(65), Decimal::from(35)]).unwrap();
        let prizes = custom.distribute(Decimal::from(200));
        assert_eq!(prizes.payouts, vec![Decimal::from(130), Decimal::from(70)]);
    }
}
