//! Points system data models.

use serde::{Deserialize, Serialize};

use super::allocator::validate_allocations;
use crate::tournament::{TournamentError, TournamentResult};

/// Season-scoped points configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsSystem {
    pub id: i64,
    pub season_id: i64,
    pub name: String,
    /// Flat award for positions no allocation covers
    pub participation_points: i32,
    /// Bonus per knockout, stacks with position points
    pub knockout_points: i32,
}

/// Points for a single position or an inclusive position range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsAllocation {
    pub id: i64,
    pub points_system_id: i64,
    pub position: u32,
    /// `None` means this position only
    pub position_end: Option<u32>,
    pub points: i32,
}

impl PointsAllocation {
    /// Last position covered by this allocation
    pub fn last_position(&self) -> u32 {
        self.position_end.unwrap_or(self.position)
    }

    pub fn covers(&self, position: u32) -> bool {
        position >= self.position && position <= self.last_position()
    }
}

/// Points system as submitted by season management
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPointsSystem {
    pub season_id: i64,
    pub name: String,
    #[serde(default)]
    pub participation_points: i32,
    #[serde(default)]
    pub knockout_points: i32,
    pub allocations: Vec<NewPointsAllocation>,
}

/// Allocation as submitted by season management
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewPointsAllocation {
    pub position: u32,
    pub position_end: Option<u32>,
    pub points: i32,
}

impl NewPointsSystem {
    pub fn validate(&self) -> TournamentResult<()> {
        if self.name.trim().is_empty() {
            return Err(TournamentError::Validation(
                "points system name must not be empty".to_string(),
            ));
        }
        validate_allocations(&self.allocations)
    }
}
