//! Deadline and cancellation wrappers for async codec operations.
//!
//! The codec itself never waits. These helpers bound the time a caller
//! spends waiting on the byte source or sink and turn an elapsed
//! deadline or a fired [`CancellationToken`] into the matching error.

use crate::error::{Result, WireError};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default deadline for a single send or receive
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shortest deadline a configuration may ask for
pub const MIN_TIMEOUT: Duration = Duration::from_millis(10);

/// Longest deadline a configuration may ask for
pub const MAX_TIMEOUT: Duration = Duration::from_secs(600);

/// Run `fut` with a deadline, mapping expiry to `WireError::Timeout`.
pub async fn with_timeout_error<F, T>(fut: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(WireError::Timeout(duration)),
    }
}

/// Like [`with_timeout_error`], but also abandons `fut` when `cancel` fires.
///
/// Cancellation wins if both happen in the same poll.
pub async fn with_deadline<F, T>(fut: F, duration: Duration, cancel: &CancellationToken) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WireError::Cancelled),
        result = with_timeout_error(fut, duration) => result,
    }
}
