//! Refresh job API handlers.
//!
//! Listing and detail for refresh jobs and their reports.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::db::models::JobResponse;
use crate::error::AppError;
use crate::services::{JobFilter, JobService};

/// Query parameters for listing jobs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListJobsQuery {
    pub source_id: Option<i64>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// List refresh jobs, newest first.
///
/// GET /api/jobs
pub async fn list(
    State(service): State<JobService>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobResponse>>, AppError> {
    let filter = JobFilter {
        source_id: query.source_id,
        status: query.status,
        limit: query.limit,
        offset: query.offset,
    };

    let jobs = service.list(&filter).await?;
    Ok(Json(jobs.into_iter().map(JobResponse::from).collect()))
}

/// Get refresh job details.
///
/// GET /api/jobs/{job_id}
pub async fn get(
    State(service): State<JobService>,
    Path(job_id): Path<i64>,
) -> Result<Json<JobResponse>, AppError> {
    let job = service.get(job_id).await?;
    Ok(Json(job.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_default() {
        let query = ListJobsQuery::default();
        assert!(query.source_id.is_none());
        assert!(query.limit.is_none());
    }

    #[test]
    fn test_list_query_deserialization() {
        let query: ListJobsQuery =
            serde_json::from_str(r#"{"source_id": 42, "status": "SUCCESS", "limit": 10}"#)
                .unwrap();
        assert_eq!(query.source_id, Some(42));
        assert_eq!(query.status.as_deref(), Some("SUCCESS"));
        assert_eq!(query.limit, Some(10));
    }
}
