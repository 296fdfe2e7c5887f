//! Event handling API handlers.
//!
//! Workers report refresh progress here: a claim before running, then the
//! outcome. Claims are idempotent for the same worker and conflict for a
//! different one.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use geosync_drivers::FetchSummary;

use crate::error::AppError;
use crate::services::{ClaimOutcome, JobService};

/// Worker event request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRequest {
    /// Event name (refresh.claimed, refresh.completed, refresh.failed).
    pub name: String,

    /// Refresh job ID.
    pub job_id: String,

    /// Worker identity. Required for refresh.claimed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,

    /// Features accepted, for refresh.completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_count: Option<i64>,

    /// Rows or features rejected, for refresh.completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<i64>,

    /// Per-category report lines, for refresh.completed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,

    /// Failure message, for refresh.failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response for event handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    /// Outcome of the event ("claimed", "already_claimed", "ok").
    pub status: String,

    /// Refresh job ID the event applied to.
    pub job_id: String,
}

/// Handle a worker event.
///
/// POST /api/events
///
/// # Returns
///
/// - `200 OK` with `status: "claimed"` when this worker took the job
/// - `200 OK` with `status: "already_claimed"` when it already held it
/// - `409 Conflict` when a different worker holds the job
/// - `200 OK` with `status: "ok"` for accepted outcome reports
pub async fn handle_event(
    State(service): State<JobService>,
    Json(request): Json<EventRequest>,
) -> Result<Json<EventResponse>, AppError> {
    debug!(
        name = %request.name,
        job_id = %request.job_id,
        worker_id = request.worker_id.as_deref(),
        "Event received"
    );

    let job_id: i64 = request
        .job_id
        .parse()
        .map_err(|_| AppError::Validation(format!("Invalid job_id: {}", request.job_id)))?;

    match request.name.as_str() {
        "refresh.claimed" => {
            let worker_id = request.worker_id.as_deref().ok_or_else(|| {
                AppError::Validation("'worker_id' is required for refresh.claimed".to_string())
            })?;

            match service.claim(job_id, worker_id).await? {
                ClaimOutcome::Claimed => Ok(Json(EventResponse {
                    status: "claimed".to_string(),
                    job_id: request.job_id,
                })),
                ClaimOutcome::AlreadyClaimed {
                    worker_id: Some(holder),
                } if holder == worker_id => Ok(Json(EventResponse {
                    status: "already_claimed".to_string(),
                    job_id: request.job_id,
                })),
                ClaimOutcome::AlreadyClaimed { worker_id: holder } => {
                    Err(AppError::Conflict(format!(
                        "Job already claimed by {}",
                        holder.unwrap_or_else(|| "another worker".to_string())
                    )))
                }
            }
        }
        "refresh.completed" => {
            let job = service.get(job_id).await?;
            let summary = FetchSummary {
                feature_count: request.feature_count.unwrap_or(0),
                error_count: request.error_count.unwrap_or(0),
                messages: request.messages,
            };

            service.complete(job_id, job.source_id, &summary).await?;

            Ok(Json(EventResponse {
                status: "ok".to_string(),
                job_id: request.job_id,
            }))
        }
        "refresh.failed" => {
            let job = service.get(job_id).await?;
            let message = request
                .message
                .unwrap_or_else(|| "Refresh failed".to_string());

            service.fail(job_id, job.source_id, &message).await?;

            Ok(Json(EventResponse {
                status: "ok".to_string(),
                job_id: request.job_id,
            }))
        }
        other => Err(AppError::Validation(format!("Unknown event name: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_request_defaults() {
        let json = r#"{"name": "refresh.claimed", "job_id": "123", "worker_id": "worker-1"}"#;
        let request: EventRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.name, "refresh.claimed");
        assert!(request.feature_count.is_none());
        assert!(request.messages.is_empty());
    }

    #[test]
    fn test_completed_request_deserialization() {
        let json = r#"{
            "name": "refresh.completed",
            "job_id": "123",
            "worker_id": "worker-1",
            "feature_count": 120,
            "error_count": 3,
            "messages": ["3 rows missing coordinates"]
        }"#;
        let request: EventRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.feature_count, Some(120));
        assert_eq!(request.error_count, Some(3));
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn test_event_response_serialization() {
        let response = EventResponse {
            status: "claimed".to_string(),
            job_id: "12345".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("claimed"));
        assert!(json.contains("12345"));
    }
}
