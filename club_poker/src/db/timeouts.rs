//! Deadlines for units of work.
//!
//! A unit of work that misses its deadline is dropped, which drops its
//! transaction and rolls every write back.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::tournament::{TournamentError, TournamentResult};

/// Default timeout for single queries such as health checks (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for a settlement transaction (10 seconds)
pub const DEFAULT_SETTLEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `future`, failing with [`TournamentError::Timeout`] once `duration` elapses
///
/// # Example
///
/// ```no_run
/// use club_poker::db::timeouts::{with_timeout, DEFAULT_SETTLEMENT_TIMEOUT};
/// use club_poker::tournament::TournamentManager;
/// # async fn example(manager: &TournamentManager) -> Result<(), Box<dyn std::error::Error>> {
///
/// let summary = with_timeout(DEFAULT_SETTLEMENT_TIMEOUT, manager.settlement_summary(7)).await?;
/// println!("pool: {}", summary.prize_pool.distributable());
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TournamentResult<T>
where
    F: Future<Output = TournamentResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(TournamentError::Timeout(duration)),
    }
}

/// Run `future` with the default query timeout (5 seconds)
pub async fn with_default_timeout<F, T>(future: F) -> TournamentResult<T>
where
    F: Future<Output = TournamentResult<T>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
