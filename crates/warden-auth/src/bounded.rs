//! Deadline for cache round-trips on the request path.

use std::future::Future;
use std::time::Duration;

use warden_core::error::AppError;
use warden_core::result::AppResult;

/// Runs a cache operation, turning a missed deadline into a `Cache` error.
pub(crate) async fn within<T>(
    limit: Duration,
    op: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result,
        Err(_) => Err(AppError::cache(format!(
            "Cache operation timed out after {}ms",
            limit.as_millis()
        ))),
    }
}
