//! In-process refresh execution.
//!
//! Runs the same claim, fetch, report sequence the worker pool runs, but on
//! the server's own runtime. Inline resyncs and the local queue both go
//! through here.

use std::sync::Arc;

use geosync_drivers::DriverRegistry;

use crate::db::queries;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::queue::RefreshNotification;
use crate::services::job::{ClaimOutcome, JobService};

/// Executes refresh jobs against the driver registry.
pub struct RefreshRunner {
    db: DbPool,
    jobs: JobService,
    registry: Arc<DriverRegistry>,
    worker_id: String,
}

impl RefreshRunner {
    /// Create a new refresh runner.
    pub fn new(db: DbPool, registry: Arc<DriverRegistry>, worker_id: impl Into<String>) -> Self {
        let jobs = JobService::new(db.clone());
        Self {
            db,
            jobs,
            registry,
            worker_id: worker_id.into(),
        }
    }

    /// Claim and run one refresh job to its terminal state.
    ///
    /// A lost claim is not an error: someone else is refreshing the source
    /// and their report will land instead.
    pub async fn run(&self, notification: &RefreshNotification) -> AppResult<()> {
        match self
            .jobs
            .claim(notification.job_id, &self.worker_id)
            .await?
        {
            ClaimOutcome::AlreadyClaimed { worker_id } => {
                tracing::debug!(
                    job_id = notification.job_id,
                    holder = ?worker_id,
                    "Job already claimed, skipping"
                );
                return Ok(());
            }
            ClaimOutcome::Claimed => {}
        }

        let source = queries::source::get_source(&self.db, notification.source_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Source not found: {}", notification.source_id))
            })?;

        tracing::info!(
            source = %source.slug,
            job_id = notification.job_id,
            kind = %source.kind,
            "Refreshing source"
        );

        match self.registry.fetch(&source.spec()).await {
            Ok(summary) => {
                self.jobs
                    .complete(notification.job_id, source.id, &summary)
                    .await
            }
            Err(e) => {
                self.jobs
                    .fail(notification.job_id, source.id, &e.to_string())
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // Runner transitions are exercised end to end through the job service;
    // full tests require a database connection.
}
