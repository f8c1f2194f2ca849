//! Position-to-points lookup.

use log::warn;

use super::models::{NewPointsAllocation, PointsAllocation, PointsSystem};
use crate::tournament::{TournamentError, TournamentResult};

/// Points system with its allocations, ready for lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsTable {
    system: PointsSystem,
    /// Sorted by (position, id); the first covering entry wins
    allocations: Vec<PointsAllocation>,
}

impl PointsTable {
    /// Build a table, rejecting malformed or overlapping allocations
    pub fn new(system: PointsSystem, allocations: Vec<PointsAllocation>) -> TournamentResult<Self> {
        validate_ranges(allocations.iter().map(|a| (a.position, a.position_end)))?;
        Ok(Self::sorted(system, allocations))
    }

    /// Build a table from stored data that may predate overlap validation.
    /// Overlapping ranges resolve to the allocation with the lowest start position.
    pub fn lenient(system: PointsSystem, allocations: Vec<PointsAllocation>) -> Self {
        if let Err(err) = validate_ranges(allocations.iter().map(|a| (a.position, a.position_end)))
        {
            warn!(
                "Points system {} has inconsistent allocations ({err}); lowest start position wins",
                system.id
            );
        }
        Self::sorted(system, allocations)
    }

    fn sorted(system: PointsSystem, mut allocations: Vec<PointsAllocation>) -> Self {
        allocations.sort_by_key(|a| (a.position, a.id));
        Self {
            system,
            allocations,
        }
    }

    pub fn system(&self) -> &PointsSystem {
        &self.system
    }

    pub fn allocations(&self) -> &[PointsAllocation] {
        &self.allocations
    }

    /// Points for finishing at `position`, before knockout bonuses
    pub fn position_points(&self, position: u32) -> i32 {
        match self.allocations.iter().find(|a| a.covers(position)) {
            Some(allocation) => allocation.points,
            None if self.system.participation_points > 0 => self.system.participation_points,
            None => 0,
        }
    }

    /// Total points: position (or participation) points plus the knockout bonus
    pub fn points_for(&self, position: u32, knockouts: u32) -> i32 {
        let knockouts = i32::try_from(knockouts).unwrap_or(i32::MAX);
        self.position_points(position)
            .saturating_add(knockouts.saturating_mul(self.system.knockout_points))
    }
}

/// Validate submitted allocations before they are stored
pub fn validate_allocations(allocations: &[NewPointsAllocation]) -> TournamentResult<()> {
    validate_ranges(allocations.iter().map(|a| (a.position, a.position_end)))
}

fn validate_ranges(submitted: impl Iterator<Item = (u32, Option<u32>)>) -> TournamentResult<()> {
    let mut ranges: Vec<(u32, u32)> = Vec::new();
    for (start, end) in submitted {
        if start == 0 {
            return Err(TournamentError::Validation(
                "allocation positions start at 1".to_string(),
            ));
        }
        let end = end.unwrap_or(start);
        if end < start {
            return Err(TournamentError::Validation(format!(
                "allocation range {start}..{end} ends before it starts"
            )));
        }
        ranges.push((start, end));
    }

    ranges.sort_unstable();
    for pair in ranges.windows(2) {
        let (_, previous_end) = pair[0];
        let (next_start, _) = pair[1];
        if next_start <= previous_end {
            return Err(TournamentError::OverlappingAllocations {
                position: next_start,
            });
        }
    }
    Ok(())
}
