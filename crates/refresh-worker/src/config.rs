//! Worker configuration.

/// Refresh worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Unique worker identifier.
    pub worker_id: String,

    /// Sync server base URL.
    pub server_url: String,

    /// NATS server URL.
    pub nats_url: String,

    /// NATS stream holding refresh notifications.
    pub nats_stream: String,

    /// Durable consumer name shared by the worker fleet.
    pub nats_consumer: String,

    /// Maximum concurrent refresh executions.
    pub max_concurrent_refreshes: usize,
}

impl WorkerConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self {
            worker_id: std::env::var("WORKER_ID")
                .unwrap_or_else(|_| format!("worker-{}", uuid::Uuid::new_v4())),
            server_url: std::env::var("GEOSYNC_SERVER_URL")
                .unwrap_or_else(|_| "http://localhost:8090".to_string()),
            nats_url: std::env::var("NATS_URL")
                .unwrap_or_else(|_| "nats://localhost:4222".to_string()),
            nats_stream: std::env::var("NATS_STREAM")
                .unwrap_or_else(|_| "geosync_refresh".to_string()),
            nats_consumer: std::env::var("NATS_CONSUMER")
                .unwrap_or_else(|_| "refresh-worker".to_string()),
            max_concurrent_refreshes: std::env::var("WORKER_MAX_CONCURRENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", uuid::Uuid::new_v4()),
            server_url: "http://localhost:8090".to_string(),
            nats_url: "nats://localhost:4222".to_string(),
            nats_stream: "geosync_refresh".to_string(),
            nats_consumer: "refresh-worker".to_string(),
            max_concurrent_refreshes: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_local_services() {
        let config = WorkerConfig::default();
        assert_eq!(config.server_url, "http://localhost:8090");
        assert_eq!(config.nats_url, "nats://localhost:4222");
        assert_eq!(config.nats_stream, "geosync_refresh");
        assert_eq!(config.nats_consumer, "refresh-worker");
        assert_eq!(config.max_concurrent_refreshes, 4);
        assert!(config.worker_id.starts_with("worker-"));
    }
}
