//! Per-call deadlines for store operations.

use std::future::Future;
use std::time::Duration;

use mealiesync_shared::{MealieSyncError, Result};

/// Run one store call under its own deadline.
///
/// An expired deadline surfaces as [`MealieSyncError::Timeout`] for that call only.
pub(crate) async fn bounded<T, F>(
    timeout: Duration,
    operation: impl Into<String>,
    call: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_elapsed) => Err(MealieSyncError::timeout(operation, timeout)),
    }
}
