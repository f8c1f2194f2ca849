//! Settlement math.
//!
//! Every figure a club sees (previews, standings, the final settlement) is
//! produced by the functions in this module, so the numbers shown before the
//! tournament ends are the numbers written when it is finalized.
//!
//! The pipeline is: [`RevenueTotals`] → [`RakeBreakdown`] → [`PrizePool`] →
//! [`PayoutStructure::distribute`], with [`rank`] resolving the finishing order
//! and [`PointsTable`](crate::points::PointsTable) turning positions into
//! seasonal points.
//!
//! ## Example
//!
//! ```
//! use club_poker::settlement::{PayoutStructure, RakePolicy, SettlementSummary};
//! use club_poker::tournament::{NewTournament, Registration, Tournament};
//! use rust_decimal::Decimal;
//!
//! let mut config = NewTournament::new(1, "Thursday Deepstack", Decimal::from(50));
//! config.buy_in_rake = RakePolicy::percentage(Decimal::from(10));
//! let tournament = Tournament::new(1, &config).unwrap();
//!
//! let registrations: Vec<Registration> =
//!     (1..=8).map(|id| Registration::new(id, 1, 100 + id)).collect();
//!
//! let summary = SettlementSummary::compute(&tournament, &registrations);
//! assert_eq!(summary.prize_pool.distributable(), Decimal::from(360));
//! assert_eq!(summary.prizes.payouts[0], Decimal::from(180));
//! # let _ = PayoutStructure::Standard;
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod high_hand;
pub mod payout;
pub mod prize_pool;
pub mod rake;
pub mod ranking;
pub mod revenue;

pub use high_hand::{HighHandConfig, HighHandSummary};
pub use payout::{PayoutStructure, PrizeStructure};
pub use prize_pool::PrizePool;
pub use rake::{RakeBreakdown, RakePolicy, RakeType};
pub use ranking::{RankedEntry, compare_finish, rank};
pub use revenue::RevenueTotals;

use crate::points::PointsTable;
use crate::tournament::{PlayerId, Registration, RegistrationId, Tournament, TournamentId};

/// Read-only money summary of a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub tournament_id: TournamentId,
    pub entrants: u32,
    pub remaining: u32,
    pub revenue: RevenueTotals,
    pub rake: RakeBreakdown,
    pub prize_pool: PrizePool,
    pub payout_structure: String,
    pub prizes: PrizeStructure,
    pub high_hand: Option<HighHandSummary>,
}

impl SettlementSummary {
    pub fn compute(tournament: &Tournament, registrations: &[Registration]) -> Self {
        let revenue = RevenueTotals::aggregate(tournament, registrations);
        let rake = RakeBreakdown::calculate(tournament, &revenue);
        let prize_pool = PrizePool::resolve(tournament, &revenue, &rake);
        let prizes = tournament
            .payout_structure
            .distribute(prize_pool.distributable());

        Self {
            tournament_id: tournament.id,
            entrants: count(registrations.iter()),
            remaining: count(registrations.iter().filter(|r| !r.is_eliminated)),
            revenue,
            rake,
            prize_pool,
            payout_structure: tournament.payout_structure.name().to_string(),
            prizes,
            high_hand: tournament
                .high_hand
                .as_ref()
                .map(|config| HighHandSummary::compute(config, registrations)),
        }
    }
}

fn count<'a>(registrations: impl Iterator<Item = &'a Registration>) -> u32 {
    u32::try_from(registrations.count()).unwrap_or(u32::MAX)
}

/// Values written back to one registration at settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResult {
    pub registration_id: RegistrationId,
    pub player_id: PlayerId,
    pub final_position: u32,
    /// `None` for positions outside the paid places
    pub prize_amount: Option<Decimal>,
    /// `None` when points are not tracked
    pub points_awarded: Option<i32>,
}

/// Everything finalize writes, computed without touching storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub summary: SettlementSummary,
    /// Ordered by final position
    pub results: Vec<RegistrationResult>,
    /// Whether `points_awarded` should be persisted
    pub write_points: bool,
}

/// Rank registrations and attach prizes and points.
///
/// Points are only computed when the tournament tracks them and a table is
/// supplied.
pub fn plan_settlement(
    tournament: &Tournament,
    registrations: &[Registration],
    points: Option<&PointsTable>,
) -> SettlementPlan {
    let summary = SettlementSummary::compute(tournament, registrations);
    let points = points.filter(|_| tournament.track_points);
    let by_id: HashMap<RegistrationId, &Registration> =
        registrations.iter().map(|r| (r.id, r)).collect();

    let results = rank(registrations)
        .into_iter()
        .filter_map(|entry| {
            let registration = by_id.get(&entry.registration_id)?;
            Some(RegistrationResult {
                registration_id: entry.registration_id,
                player_id: registration.player_id,
                final_position: entry.position,
                prize_amount: summary
                    .prizes
                    .payout_for_position(entry.position as usize),
                points_awarded: points
                    .map(|table| table.points_for(entry.position, registration.knockouts)),
            })
        })
        .collect();

    SettlementPlan {
        summary,
        results,
        write_points: points.is_some(),
    }
}

/// One row of the live standings preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub position: u32,
    pub registration_id: RegistrationId,
    pub player_id: PlayerId,
    pub is_eliminated: bool,
    pub knockouts: u32,
    pub projected_prize: Option<Decimal>,
    pub projected_points: Option<i32>,
}

impl SettlementPlan {
    /// Project the plan as standings, without writing anything
    pub fn standings(&self, registrations: &[Registration]) -> Vec<Standing> {
        let by_id: HashMap<RegistrationId, &Registration> =
            registrations.iter().map(|r| (r.id, r)).collect();

        self.results
            .iter()
            .map(|result| {
                let registration = by_id.get(&result.registration_id);
                Standing {
                    position: result.final_position,
                    registration_id: result.registration_id,
                    player_id: result.player_id,
                    is_eliminated: registration.is_some_and(|r| r.is_eliminated),
                    knockouts: registration.map_or(0, |r| r.knockouts),
                    projected_prize: result.prize_amount,
                    projected_points: result.points_awarded,
                }
            })
            .collect()
    }
}

/// Outcome of finalizing a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub summary: SettlementSummary,
    pub results: Vec<RegistrationResult>,
    pub points_written: bool,
    pub settled_at: DateTime<Utc>,
}

impl SettlementReport {
    pub fn new(plan: SettlementPlan, settled_at: DateTime<Utc>) -> Self {
        Self {
            summary: plan.summary,
            results: plan.results,
            points_written: plan.write_points,
            settled_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::{PointsAllocation, PointsSystem};
    use crate::tournament::NewTournament;
    use chrono::TimeZone;

    fn tournament(config: NewTournament) -> Tournament {
        Tournament::new(7, &config).unwrap()
    }

    fn field(count: i64) -> Vec<Registration> {
        (1..=count).map(|id| Registration::new(id, 7, 500 + id)).collect()
    }

    fn eliminate(reg: &mut Registration, minute: u32, seq: i64) {
        reg.is_eliminated = true;
        reg.elimination_time = Some(Utc.with_ymd_and_hms(2026, 3, 6, 22, minute, 0).unwrap());
        reg.elimination_seq = Some(seq);
    }

    fn points_table() -> PointsTable {
        let system = PointsSystem {
            id: 1,
            season_id: 2026,
            name: "League".to_string(),
            participation_points: 10,
            knockout_points: 5,
        };
        let allocations = vec![
            PointsAllocation {
                id: 1,
                points_system_id: 1,
                position: 1,
                position_end: None,
                points: 100,
            },
            PointsAllocation {
                id: 2,
                points_system_id: 1,
                position: 2,
                position_end: None,
                points: 75,
            },
        ];
        PointsTable::new(system, allocations).unwrap()
    }

    #[test]
    fn test_eight_players_ten_percent_rake() {
        let mut config = NewTournament::new(1, "Friday", Decimal::from(50));
        config.buy_in_rake = RakePolicy::percentage(Decimal::from(10));
        let tournament = tournament(config);

        let summary = SettlementSummary::compute(&tournament, &field(8));
        assert_eq!(summary.revenue.buy_ins, 8);
        assert_eq!(summary.prize_pool.gross, Decimal::from(400));
        assert_eq!(summary.rake.total(), Decimal::from(40));
        assert_eq!(summary.prize_pool.distributable(), Decimal::from(360));
        assert_eq!(
            summary.prizes.payouts,
            vec![Decimal::from(180), Decimal::from(108), Decimal::from(72)]
        );
    }

    #[test]
    fn test_revenue_counts_every_stream() {
        let mut config = NewTournament::new(1, "Rebuy Madness", Decimal::from(20));
        config.rebuy_amount = Some(Decimal::from(20));
        config.addon_amount = Some(Decimal::from(10));
        config.rebuy_rake = RakePolicy::fixed(Decimal::from(2));
        let tournament = tournament(config);

        let mut regs = field(4);
        regs[0].rebuys = 2;
        regs[1].rebuys = 1;
        regs[2].addons = 1;
        regs[3].addons = 1;

        let summary = SettlementSummary::compute(&tournament, &regs);
        assert_eq!(summary.revenue.rebuys, 3);
        assert_eq!(summary.revenue.addons, 2);
        assert_eq!(summary.revenue.rebuy_total, Decimal::from(60));
        assert_eq!(summary.revenue.addon_total, Decimal::from(20));
        assert_eq!(summary.rake.rebuy, Decimal::from(6));
        assert_eq!(summary.prize_pool.gross, Decimal::from(160));
        assert_eq!(summary.prize_pool.calculated, Decimal::from(154));
    }

    #[test]
    fn test_missing_stream_price_counts_as_zero() {
        let tournament = tournament(NewTournament::new(1, "Freezeout", Decimal::from(30)));
        let mut regs = field(2);
        regs[0].rebuys = 3;

        let summary = SettlementSummary::compute(&tournament, &regs);
        assert_eq!(summary.revenue.rebuys, 3);
        assert_eq!(summary.revenue.rebuy_total, Decimal::ZERO);
        assert_eq!(summary.prize_pool.gross, Decimal::from(60));
    }

    #[test]
    fn test_plan_assigns_positions_prizes_and_clears_out_of_money() {
        let tournament = tournament(NewTournament::new(1, "Friday", Decimal::from(50)));
        let mut regs = field(5);
        eliminate(&mut regs[0], 10, 1);
        eliminate(&mut regs[3], 20, 2);
        eliminate(&mut regs[4], 30, 3);

        let plan = plan_settlement(&tournament, &regs, None);
        let order: Vec<(RegistrationId, u32)> = plan
            .results
            .iter()
            .map(|r| (r.registration_id, r.final_position))
            .collect();
        assert_eq!(order, vec![(2, 1), (3, 2), (5, 3), (4, 4), (1, 5)]);

        assert_eq!(plan.results[0].prize_amount, Some(Decimal::from(125)));
        assert_eq!(plan.results[2].prize_amount, Some(Decimal::from(50)));
        assert_eq!(plan.results[3].prize_amount, None);
        assert!(!plan.write_points);
        assert!(plan.results.iter().all(|r| r.points_awarded.is_none()));
    }

    #[test]
    fn test_plan_awards_points_when_tracked() {
        let mut config = NewTournament::new(1, "League Night", Decimal::from(50));
        config.track_points = true;
        config.points_system_id = Some(1);
        let tournament = tournament(config);

        let mut regs = field(3);
        regs[1].knockouts = 2;
        eliminate(&mut regs[2], 15, 1);

        let table = points_table();
        let plan = plan_settlement(&tournament, &regs, Some(&table));
        assert!(plan.write_points);
        assert_eq!(plan.results[0].points_awarded, Some(100));
        assert_eq!(plan.results[1].points_awarded, Some(85));
        assert_eq!(plan.results[2].points_awarded, Some(10));
    }

    #[test]
    fn test_untracked_tournament_ignores_points_table() {
        let tournament = tournament(NewTournament::new(1, "Casual", Decimal::from(10)));
        let table = points_table();
        let plan = plan_settlement(&tournament, &field(2), Some(&table));
        assert!(!plan.write_points);
        assert!(plan.results.iter().all(|r| r.points_awarded.is_none()));
    }

    #[test]
    fn test_manual_pool_drives_payouts() {
        let mut tournament = tournament(NewTournament::new(1, "Guarantee", Decimal::from(50)));
        tournament.manual_prize_pool = Some(Decimal::from(1000));

        let summary = SettlementSummary::compute(&tournament, &field(4));
        assert_eq!(summary.prize_pool.calculated, Decimal::from(200));
        assert_eq!(summary.prizes.payouts[0], Decimal::from(500));
    }

    #[test]
    fn test_empty_tournament_plans_nothing() {
        let tournament = tournament(NewTournament::new(1, "No Shows", Decimal::from(50)));
        let plan = plan_settlement(&tournament, &[], None);
        assert!(plan.results.is_empty());
        assert_eq!(plan.summary.prize_pool.distributable(), Decimal::ZERO);
        assert!(plan.summary.prizes.payouts.is_empty());
    }

    #[test]
    fn test_standings_follow_plan() {
        let tournament = tournament(NewTournament::new(1, "Friday", Decimal::from(50)));
        let mut regs = field(3);
        eliminate(&mut regs[0], 5, 1);
        regs[1].knockouts = 1;

        let plan = plan_settlement(&tournament, &regs, None);
        let standings = plan.standings(&regs);
        assert_eq!(standings.len(), 3);
        assert_eq!(standings[0].registration_id, 2);
        assert_eq!(standings[0].knockouts, 1);
        assert!(standings[2].is_eliminated);
        assert_eq!(standings[2].projected_prize, Some(Decimal::from(30)));
    }
}
