//! Refresh executor.

use anyhow::Result;
use geosync_drivers::{create_default_registry, DriverRegistry};

use crate::client::SyncServerClient;
use crate::nats::RefreshNotification;

/// Refresh executor that runs source drivers and reports results.
pub struct RefreshExecutor {
    /// Driver registry with all available source drivers.
    registry: DriverRegistry,

    /// Sync server client for source lookup and result reporting.
    client: SyncServerClient,

    /// Worker ID.
    worker_id: String,
}

impl RefreshExecutor {
    /// Create a new refresh executor.
    pub fn new(client: SyncServerClient, worker_id: String) -> Self {
        Self {
            registry: create_default_registry(),
            client,
            worker_id,
        }
    }

    /// Execute a claimed refresh job end to end.
    ///
    /// Fetches the source definition, runs the matching driver, and
    /// reports the outcome back to the sync server. The job must already
    /// be claimed by this worker.
    pub async fn execute(&self, notification: &RefreshNotification) -> Result<()> {
        let source = match self.client.fetch_source(notification.source_id).await {
            Ok(source) => source,
            Err(e) => {
                self.client
                    .report_failed(
                        notification.job_id,
                        &self.worker_id,
                        &format!("Source lookup failed: {}", e),
                    )
                    .await?;
                return Err(e);
            }
        };

        let spec = source.to_spec();

        tracing::debug!(
            job_id = notification.job_id,
            slug = %spec.slug,
            kind = %spec.kind,
            "Running source driver"
        );

        match self.registry.fetch(&spec).await {
            Ok(summary) => {
                tracing::info!(
                    job_id = notification.job_id,
                    slug = %spec.slug,
                    feature_count = summary.feature_count,
                    error_count = summary.error_count,
                    "Refresh completed"
                );

                self.client
                    .report_completed(notification.job_id, &self.worker_id, &summary)
                    .await
            }
            Err(e) => {
                tracing::warn!(
                    job_id = notification.job_id,
                    slug = %spec.slug,
                    error = %e,
                    "Refresh failed"
                );

                self.client
                    .report_failed(notification.job_id, &self.worker_id, &e.to_string())
                    .await?;

                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosync_drivers::SourceKind;

    #[test]
    fn test_refresh_executor_creation() {
        let client = SyncServerClient::new("http://localhost:8090");
        let executor = RefreshExecutor::new(client, "worker-1".to_string());

        // Verify drivers are registered
        assert!(executor.registry.has(SourceKind::Geojson));
        assert!(executor.registry.has(SourceKind::Csv));
        assert!(executor.registry.has(SourceKind::Wmts));
    }
}
