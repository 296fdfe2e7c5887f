//! Periodic refresh sweep.
//!
//! Sources with a `refresh_interval_minutes` are re-dispatched in the
//! background once the interval has elapsed since their last successful
//! refresh.

use std::time::Duration;

use crate::db::queries;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::ResyncService;

/// Start the refresh sweep background task.
pub fn start_sweep(
    db: DbPool,
    resync: ResyncService,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // Skip first immediate tick

        loop {
            ticker.tick().await;

            match sweep_once(&db, &resync).await {
                Ok(0) => {}
                Ok(dispatched) => {
                    tracing::info!(dispatched, "Refresh sweep dispatched");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Refresh sweep failed");
                }
            }
        }
    })
}

/// Dispatch one background refresh for every due source.
async fn sweep_once(db: &DbPool, resync: &ResyncService) -> AppResult<usize> {
    let due = queries::source::list_due_sources(db).await?;

    let mut dispatched = 0;
    for source in &due {
        match resync.resync(source.id, false, false).await {
            Ok(_) => {
                dispatched += 1;
            }
            // A refresh slipped in since the due query; next tick will see it.
            Err(AppError::SyncConflict(_)) => {
                tracing::debug!(source = %source.slug, "Sweep skipped, source busy");
            }
            Err(e) => {
                tracing::warn!(source = %source.slug, error = %e, "Sweep dispatch failed");
            }
        }
    }

    Ok(dispatched)
}

#[cfg(test)]
mod tests {
    // Note: Full tests require a database connection
    // Dispatch behavior is covered by the resync service tests
}
