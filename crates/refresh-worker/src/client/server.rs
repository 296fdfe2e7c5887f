//! Sync server HTTP client.

use anyhow::Result;
use geosync_drivers::{FetchSummary, GeometryKind, SourceKind, SourceSpec};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of claiming a refresh job.
#[derive(Debug, Clone)]
pub enum ClaimResult {
    /// Successfully claimed the job.
    Claimed,
    /// Job already claimed by another worker.
    AlreadyClaimed,
    /// Failed to claim (error).
    Failed(String),
}

/// Source definition fetched from the sync server.
///
/// Only the fields the drivers consume are kept; anything else in the
/// response is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDetail {
    /// Source ID (stringified snowflake).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Stable slug.
    pub slug: String,

    /// Driver selector.
    pub kind: SourceKind,

    /// Declared geometry type.
    pub geom_type: GeometryKind,

    /// Payload location.
    pub uri: String,

    /// Kind-specific settings.
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl SourceDetail {
    /// Build the spec handed to the driver registry.
    pub fn to_spec(&self) -> SourceSpec {
        SourceSpec {
            slug: self.slug.clone(),
            kind: self.kind,
            geom_type: self.geom_type,
            uri: self.uri.clone(),
            settings: self.settings.clone(),
        }
    }
}

/// Event to emit to the sync server.
///
/// Mirrors the server's `/api/events` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerEvent {
    /// Event name (e.g., "refresh.claimed", "refresh.completed").
    pub name: String,

    /// Job ID, stringified.
    pub job_id: String,

    /// Worker emitting the event.
    pub worker_id: Option<String>,

    /// Features accepted, for refresh.completed.
    pub feature_count: Option<i64>,

    /// Rows rejected, for refresh.completed.
    pub error_count: Option<i64>,

    /// Per-category report lines, for refresh.completed.
    #[serde(default)]
    pub messages: Vec<String>,

    /// Failure message, for refresh.failed.
    pub message: Option<String>,
}

/// HTTP client for the sync server API.
#[derive(Clone)]
pub struct SyncServerClient {
    client: reqwest::Client,
    server_url: String,
}

impl SyncServerClient {
    /// Create a new sync server client.
    pub fn new(server_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    /// Claim a refresh job by emitting a refresh.claimed event.
    ///
    /// Returns Claimed if successful, AlreadyClaimed if 409, Failed otherwise.
    pub async fn claim_job(&self, job_id: i64, worker_id: &str) -> Result<ClaimResult> {
        let event = WorkerEvent {
            name: "refresh.claimed".to_string(),
            job_id: job_id.to_string(),
            worker_id: Some(worker_id.to_string()),
            feature_count: None,
            error_count: None,
            messages: Vec::new(),
            message: None,
        };

        let response = self
            .client
            .post(format!("{}/api/events", self.server_url))
            .json(&event)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(ClaimResult::Claimed),
            StatusCode::CONFLICT => Ok(ClaimResult::AlreadyClaimed),
            status => {
                let body = response.text().await.unwrap_or_default();
                Ok(ClaimResult::Failed(format!("Status {}: {}", status, body)))
            }
        }
    }

    /// Fetch the source definition for a refresh job.
    pub async fn fetch_source(&self, source_id: i64) -> Result<SourceDetail> {
        let response = self
            .client
            .get(format!("{}/api/sources/{}", self.server_url, source_id))
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to fetch source: {}", body);
        }

        let source: SourceDetail = response.json().await?;
        Ok(source)
    }

    /// Emit an event to the sync server.
    pub async fn emit_event(&self, event: WorkerEvent) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/api/events", self.server_url))
            .json(&event)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to emit event: {}", body);
        }

        Ok(())
    }

    /// Emit an event with retry.
    pub async fn emit_event_with_retry(&self, event: WorkerEvent, max_retries: u32) -> Result<()> {
        let mut delay = Duration::from_millis(500);

        for attempt in 0..=max_retries {
            match self.emit_event(event.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < max_retries => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries,
                        error = %e,
                        "Event emission failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(10));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Report a successful refresh.
    pub async fn report_completed(
        &self,
        job_id: i64,
        worker_id: &str,
        summary: &FetchSummary,
    ) -> Result<()> {
        let event = WorkerEvent {
            name: "refresh.completed".to_string(),
            job_id: job_id.to_string(),
            worker_id: Some(worker_id.to_string()),
            feature_count: Some(summary.feature_count),
            error_count: Some(summary.error_count),
            messages: summary.messages.clone(),
            message: None,
        };

        self.emit_event_with_retry(event, 3).await
    }

    /// Report a failed refresh.
    pub async fn report_failed(&self, job_id: i64, worker_id: &str, message: &str) -> Result<()> {
        let event = WorkerEvent {
            name: "refresh.failed".to_string(),
            job_id: job_id.to_string(),
            worker_id: Some(worker_id.to_string()),
            feature_count: None,
            error_count: None,
            messages: Vec::new(),
            message: Some(message.to_string()),
        };

        self.emit_event_with_retry(event, 3).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_event_serialization() {
        let event = WorkerEvent {
            name: "refresh.claimed".to_string(),
            job_id: "7000001".to_string(),
            worker_id: Some("worker-1".to_string()),
            feature_count: None,
            error_count: None,
            messages: Vec::new(),
            message: None,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("refresh.claimed"));
        assert!(json.contains("7000001"));
    }

    #[test]
    fn test_source_detail_deserialization() {
        let json = serde_json::json!({
            "id": "42",
            "name": "Towns of Provence",
            "slug": "towns-of-provence",
            "kind": "geojson",
            "geom_type": "polygon",
            "uri": "https://example.com/towns.geojson",
            "settings": {},
            "status": "IDLE",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        });

        let source: SourceDetail = serde_json::from_value(json).unwrap();
        assert_eq!(source.slug, "towns-of-provence");
        assert_eq!(source.kind, SourceKind::Geojson);
        assert_eq!(source.geom_type, GeometryKind::Polygon);

        let spec = source.to_spec();
        assert_eq!(spec.uri, "https://example.com/towns.geojson");
    }

    #[test]
    fn test_client_creation() {
        let client = SyncServerClient::new("http://localhost:8090");
        assert_eq!(client.server_url, "http://localhost:8090");

        let client = SyncServerClient::new("http://localhost:8090/");
        assert_eq!(client.server_url, "http://localhost:8090");
    }
}
