//! Refresh job database queries.

use chrono::{DateTime, Utc};

use crate::db::models::RefreshJob;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

type JobRow = (
    i64,
    i64,
    String,
    Option<String>,
    Option<i64>,
    Option<i64>,
    Option<String>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
);

fn row_to_job(row: JobRow) -> AppResult<RefreshJob> {
    let (
        id,
        source_id,
        status,
        worker_id,
        feature_count,
        error_count,
        message,
        started_at,
        ended_at,
        created_at,
    ) = row;

    Ok(RefreshJob {
        id,
        source_id,
        status: status
            .parse()
            .map_err(|e| AppError::Internal(format!("Corrupt job row {}: {}", id, e)))?,
        worker_id,
        feature_count,
        error_count,
        message,
        started_at,
        ended_at,
        created_at,
    })
}

/// Insert a PENDING job for a source, returning its ID.
pub async fn insert_job(pool: &DbPool, source_id: i64) -> AppResult<i64> {
    let result: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO geosync.refresh_job (source_id, status)
        VALUES ($1, 'PENDING')
        RETURNING id
        "#,
    )
    .bind(source_id)
    .fetch_one(pool)
    .await?;

    Ok(result.0)
}

/// Get a job by ID.
pub async fn get_job(pool: &DbPool, id: i64) -> AppResult<Option<RefreshJob>> {
    let row: Option<JobRow> = sqlx::query_as(
        r#"
        SELECT id, source_id, status, worker_id, feature_count, error_count,
               message, started_at, ended_at, created_at
        FROM geosync.refresh_job
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_job).transpose()
}

/// List jobs, newest first, with optional source and status filters.
pub async fn list_jobs(
    pool: &DbPool,
    source_id: Option<i64>,
    status: Option<&str>,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<RefreshJob>> {
    let rows: Vec<JobRow> = sqlx::query_as(
        r#"
        SELECT id, source_id, status, worker_id, feature_count, error_count,
               message, started_at, ended_at, created_at
        FROM geosync.refresh_job
        WHERE ($1::BIGINT IS NULL OR source_id = $1)
          AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(source_id)
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_job).collect()
}

/// Claim a pending job for a worker.
///
/// Compare-and-set on PENDING, so exactly one worker wins a contested job.
/// Returns whether this caller took the claim.
pub async fn try_claim_job(pool: &DbPool, id: i64, worker_id: &str) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE geosync.refresh_job
        SET status = 'RUNNING', worker_id = $2, started_at = NOW()
        WHERE id = $1 AND status = 'PENDING'
        "#,
    )
    .bind(id)
    .bind(worker_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fail a job that never got claimed (dispatch error path).
pub async fn abandon_pending_job(pool: &DbPool, id: i64, message: &str) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE geosync.refresh_job
        SET status = 'FAILURE', message = $2, ended_at = NOW()
        WHERE id = $1 AND status = 'PENDING'
        "#,
    )
    .bind(id)
    .bind(message)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::JobStatus;

    #[test]
    fn test_row_to_job_rejects_unknown_status() {
        let row: JobRow = (
            1,
            2,
            "QUEUED".to_string(),
            None,
            None,
            None,
            None,
            None,
            None,
            Utc::now(),
        );
        assert!(matches!(row_to_job(row), Err(AppError::Internal(_))));
    }

    #[test]
    fn test_row_to_job_parses_status() {
        let row: JobRow = (
            1,
            2,
            "PENDING".to_string(),
            None,
            None,
            None,
            None,
            None,
            None,
            Utc::now(),
        );
        let job = row_to_job(row).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(!job.status.is_terminal());
    }
}
