//! Refresh job lifecycle service.
//!
//! Owns the claim and report transitions. Claims are compare-and-set so a
//! contested job goes to exactly one worker; reports move the job and its
//! source to their terminal states in one transaction.

use geosync_drivers::FetchSummary;
use serde::{Deserialize, Serialize};

use crate::db::models::{JobStatus, RefreshJob};
use crate::db::queries;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

/// Outcome of a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller took the claim.
    Claimed,
    /// Someone already holds the job.
    AlreadyClaimed { worker_id: Option<String> },
}

/// Filter for listing jobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobFilter {
    pub source_id: Option<i64>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Refresh job lifecycle service.
#[derive(Clone)]
pub struct JobService {
    db: DbPool,
}

impl JobService {
    /// Create a new job service.
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Get a job by ID.
    pub async fn get(&self, job_id: i64) -> AppResult<RefreshJob> {
        queries::job::get_job(&self.db, job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job not found: {}", job_id)))
    }

    /// List jobs with optional filters.
    pub async fn list(&self, filter: &JobFilter) -> AppResult<Vec<RefreshJob>> {
        queries::job::list_jobs(
            &self.db,
            filter.source_id,
            filter.status.as_deref(),
            filter.limit.unwrap_or(50),
            filter.offset.unwrap_or(0),
        )
        .await
    }

    /// Claim a pending job for a worker.
    pub async fn claim(&self, job_id: i64, worker_id: &str) -> AppResult<ClaimOutcome> {
        if queries::job::try_claim_job(&self.db, job_id, worker_id).await? {
            tracing::debug!(job_id, worker_id, "Job claimed");
            return Ok(ClaimOutcome::Claimed);
        }

        let job = self.get(job_id).await?;
        Ok(ClaimOutcome::AlreadyClaimed {
            worker_id: job.worker_id,
        })
    }

    /// Record a successful refresh: job SUCCESS, source DONE with its
    /// refresh timestamp.
    pub async fn complete(
        &self,
        job_id: i64,
        source_id: i64,
        summary: &FetchSummary,
    ) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE geosync.refresh_job
            SET status = 'SUCCESS', feature_count = $2, error_count = $3,
                message = $4, ended_at = NOW()
            WHERE id = $1 AND status = 'RUNNING'
            "#,
        )
        .bind(job_id)
        .bind(summary.feature_count)
        .bind(summary.error_count)
        .bind(summary.report())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!("Job {} is not running", job_id)));
        }

        sqlx::query(
            r#"
            UPDATE geosync.source
            SET status = 'DONE', last_refresh_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(source_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            job_id,
            source_id,
            feature_count = summary.feature_count,
            error_count = summary.error_count,
            "Refresh completed"
        );

        Ok(())
    }

    /// Record a failed refresh: job FAILURE, source FAILED.
    pub async fn fail(&self, job_id: i64, source_id: i64, message: &str) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE geosync.refresh_job
            SET status = 'FAILURE', message = $2, ended_at = NOW()
            WHERE id = $1 AND status = 'RUNNING'
            "#,
        )
        .bind(job_id)
        .bind(message)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!("Job {} is not running", job_id)));
        }

        sqlx::query("UPDATE geosync.source SET status = 'FAILED', updated_at = NOW() WHERE id = $1")
            .bind(source_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::warn!(job_id, source_id, message, "Refresh failed");

        Ok(())
    }

    /// Fail a job that never got claimed.
    ///
    /// Used when dispatch itself fails after the PENDING row was written.
    /// The caller releases the source.
    pub async fn abandon(&self, job_id: i64, message: &str) -> AppResult<()> {
        queries::job::abandon_pending_job(&self.db, job_id, message).await?;
        Ok(())
    }

    /// The final status of a job, for building dispatch receipts.
    pub async fn final_status(&self, job_id: i64) -> AppResult<JobStatus> {
        Ok(self.get(job_id).await?.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_filter_default() {
        let filter = JobFilter::default();
        assert!(filter.source_id.is_none());
        assert!(filter.status.is_none());
        assert!(filter.limit.is_none());
    }

    #[test]
    fn test_claim_outcome_equality() {
        assert_eq!(ClaimOutcome::Claimed, ClaimOutcome::Claimed);
        assert_ne!(
            ClaimOutcome::Claimed,
            ClaimOutcome::AlreadyClaimed {
                worker_id: Some("worker-1".to_string())
            }
        );
    }
}
