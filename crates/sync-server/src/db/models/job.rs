//! Refresh job database model.
//!
//! One row per refresh attempt. The PENDING -> RUNNING transition is the
//! worker claim; SUCCESS and FAILURE are the terminal report states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a refresh job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Dispatched, waiting for a worker.
    Pending,
    /// Claimed by a worker.
    Running,
    /// Refresh completed.
    Success,
    /// Refresh failed.
    Failure,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
        }
    }

    /// Whether the job has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "RUNNING" => Ok(JobStatus::Running),
            "SUCCESS" => Ok(JobStatus::Success),
            "FAILURE" => Ok(JobStatus::Failure),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// Refresh job entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshJob {
    pub id: i64,
    pub source_id: i64,
    pub status: JobStatus,
    pub worker_id: Option<String>,
    pub feature_count: Option<i64>,
    pub error_count: Option<i64>,
    pub message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Refresh job response (IDs stringified for JSON consumers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: String,
    pub source_id: String,
    pub status: JobStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_count: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl From<RefreshJob> for JobResponse {
    fn from(job: RefreshJob) -> Self {
        Self {
            id: job.id.to_string(),
            source_id: job.source_id.to_string(),
            status: job.status,
            worker_id: job.worker_id,
            feature_count: job.feature_count,
            error_count: job.error_count,
            message: job.message,
            started_at: job.started_at,
            ended_at: job.ended_at,
            created_at: job.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Success,
            JobStatus::Failure,
        ] {
            let parsed: JobStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("DONE".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Success.is_terminal());
        assert!(JobStatus::Failure.is_terminal());
    }

    #[test]
    fn test_response_serialization() {
        let job = RefreshJob {
            id: 98765,
            source_id: 12345,
            status: JobStatus::Success,
            worker_id: Some("worker-1".to_string()),
            feature_count: Some(120),
            error_count: Some(0),
            message: Some("120 features, 0 errors".to_string()),
            started_at: Some(Utc::now()),
            ended_at: Some(Utc::now()),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&JobResponse::from(job)).unwrap();
        assert!(json.contains("\"id\":\"98765\""));
        assert!(json.contains("\"source_id\":\"12345\""));
        assert!(json.contains("\"status\":\"SUCCESS\""));
    }
}
