//! Scheduled cleanup of expired revocation records.
//!
//! Expired records are invisible to the verifier either way; the purge just
//! keeps the table from growing without bound.

use crate::db::Database;
use crate::revocation::RevocationStore;
use std::time::Duration;
use tracing::{error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database) {
    match db.revocations().purge_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired revocation records", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up revocation records: {}", e),
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
