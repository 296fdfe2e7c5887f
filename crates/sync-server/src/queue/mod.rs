//! Refresh dispatch queue.
//!
//! A resync never runs a driver inside the request handler unless asked to:
//! it records a PENDING job and hands a [`RefreshNotification`] to the
//! [`TaskQueue`]. The NATS-backed queue notifies the worker pool; the local
//! queue runs jobs on the server's own runtime so a single-binary deployment
//! still works.

mod local;
mod nats;

pub use local::LocalTaskQueue;
pub use nats::NatsTaskQueue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// Default NATS subject for refresh notifications.
pub const DEFAULT_SUBJECT: &str = "geosync.refresh";

/// Default JetStream stream name.
pub const DEFAULT_STREAM: &str = "geosync_refresh";

/// Refresh notification handed to the queue.
///
/// Workers receive this and fetch the full task from the server API
/// using the job_id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshNotification {
    /// Job this refresh runs under.
    pub job_id: i64,

    /// Source to refresh.
    pub source_id: i64,

    /// Source slug, for logging.
    pub slug: String,

    /// Server URL for fetching task details and reporting results.
    pub server_url: String,
}

/// Dispatch seam between the resync flow and refresh execution.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Queue backend name, reported by the health endpoint.
    fn name(&self) -> &'static str;

    /// Hand the job to the background machinery and return immediately.
    async fn enqueue(&self, notification: &RefreshNotification) -> AppResult<()>;

    /// Run the job on the caller's task, returning once it reaches a
    /// terminal state.
    async fn run_inline(&self, notification: &RefreshNotification) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_serialization() {
        let notification = RefreshNotification {
            job_id: 98765,
            source_id: 12345,
            slug: "towns".to_string(),
            server_url: "http://localhost:8090".to_string(),
        };

        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains("98765"));
        assert!(json.contains("12345"));
        assert!(json.contains("towns"));
    }

    #[test]
    fn test_notification_deserialization() {
        let json = r#"{
            "job_id": 98765,
            "source_id": 12345,
            "slug": "towns",
            "server_url": "http://localhost:8090"
        }"#;

        let notification: RefreshNotification = serde_json::from_str(json).unwrap();
        assert_eq!(notification.job_id, 98765);
        assert_eq!(notification.source_id, 12345);
        assert_eq!(notification.slug, "towns");
        assert_eq!(notification.server_url, "http://localhost:8090");
    }

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_SUBJECT, "geosync.refresh");
        assert_eq!(DEFAULT_STREAM, "geosync_refresh");
    }
}
