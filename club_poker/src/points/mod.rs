//! Season points: position allocations, participation and knockout bonuses.

pub mod allocator;
pub mod models;

pub use allocator::{PointsTable, validate_allocations};
pub use models::{NewPointsAllocation, NewPointsSystem, PointsAllocation, PointsSystem};
