//! Scheduled cleanup tasks for expired data.

use crate::db::Database;
use std::time::Duration;
use tracing::{error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60); // 10 minutes

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database) {
    // Clean up expired email verification codes
    match db.verifications().cleanup_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired verification codes", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up verification codes: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&db).await;
        }
    })
}
