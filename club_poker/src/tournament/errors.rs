//! Tournament error types.

use super::models::{RegistrationId, TournamentId, TournamentStatus};
use std::time::Duration;
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error (stored JSON columns)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Non-database storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unit of work exceeded its deadline and was rolled back
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Tournament not found
    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),

    /// Registration not found
    #[error("Registration not found: {0}")]
    RegistrationNotFound(RegistrationId),

    /// Points system not found
    #[error("Points system not found: {0}")]
    PointsSystemNotFound(i64),

    /// Player already registered for this tournament
    #[error("Player {player_id} is already registered for tournament {tournament_id}")]
    AlreadyRegistered {
        tournament_id: TournamentId,
        player_id: i64,
    },

    /// Money-affecting mutation attempted after the prize pool was locked
    #[error("Prize pool is locked: cannot {action}")]
    PrizePoolLocked { action: String },

    /// Attempt to unlock a locked prize pool
    #[error("Prize pool lock is irreversible")]
    PoolLockIrreversible,

    /// Status change not permitted by the lifecycle
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: TournamentStatus,
        to: TournamentStatus,
    },

    /// Operation not allowed in the tournament's current status
    #[error("Tournament is {actual}: cannot {action}")]
    InvalidState {
        action: String,
        actual: TournamentStatus,
    },

    /// Unknown or malformed payout structure
    #[error("Invalid payout structure: {0}")]
    InvalidPayoutStructure(String),

    /// Two points allocations claim the same position
    #[error("Points allocations overlap at position {position}")]
    OverlappingAllocations { position: u32 },

    /// Malformed input
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Broad classification used by callers to map errors onto responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Policy,
    NotFound,
    Infrastructure,
}

impl TournamentError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::Validation(_)
            | TournamentError::InvalidPayoutStructure(_)
            | TournamentError::OverlappingAllocations { .. } => ErrorKind::Validation,
            TournamentError::AlreadyRegistered { .. }
            | TournamentError::PrizePoolLocked { .. }
            | TournamentError::PoolLockIrreversible
            | TournamentError::InvalidTransition { .. }
            | TournamentError::InvalidState { .. } => ErrorKind::Policy,
            TournamentError::NotFound(_)
            | TournamentError::RegistrationNotFound(_)
            | TournamentError::PointsSystemNotFound(_) => ErrorKind::NotFound,
            TournamentError::Database(_)
            | TournamentError::Serialization(_)
            | TournamentError::Storage(_)
            | TournamentError::Timeout(_) => ErrorKind::Infrastructure,
        }
    }

    /// Get a client-safe error message that doesn't leak storage internals
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_)
            | TournamentError::Serialization(_)
            | TournamentError::Storage(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    pub(crate) fn locked(action: &str) -> Self {
        TournamentError::PrizePoolLocked {
            action: action.to_string(),
        }
    }

    pub(crate) fn invalid_state(action: &str, actual: TournamentStatus) -> Self {
        TournamentError::InvalidState {
            action: action.to_string(),
            actual,
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(TournamentError::NotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(
            TournamentError::locked("add a rebuy").kind(),
            ErrorKind::Policy
        );
        assert_eq!(
            TournamentError::Validation("bad".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            TournamentError::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::Infrastructure
        );
    }

    #[test]
    fn test_client_message_sanitizes_storage() {
        let err = TournamentError::Storage("connection reset on 10.0.0.3".to_string());
        assert_eq!(err.client_message(), "Internal server error");

        let err = TournamentError::locked("add a rebuy");
        assert_eq!(err.client_message(), "Prize pool is locked: cannot add a rebuy");
    }
}
