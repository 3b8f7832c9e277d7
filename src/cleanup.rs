//! Scheduled cleanup of expired refresh tokens.

use std::time::Duration;

use tracing::{error, info};

use crate::db::RefreshTokenStore;

/// Purge expired refresh tokens once. Failures are logged, never raised.
pub async fn run_cleanup<S: RefreshTokenStore>(store: &S) {
    match store.delete_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired refresh tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up expired refresh tokens: {}", e),
    }
}

/// Spawn a background task that runs cleanup every `period`.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler<S>(store: S, period: Duration) -> tokio::task::JoinHandle<()>
where
    S: RefreshTokenStore + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately and startup already ran a sweep.
        interval.tick().await;

        loop {
            interval.tick().await;
            run_cleanup(&store).await;
        }
    })
}
