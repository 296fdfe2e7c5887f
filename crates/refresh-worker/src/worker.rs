//! Worker lifecycle management.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::client::{ClaimResult, SyncServerClient};
use crate::config::WorkerConfig;
use crate::executor::RefreshExecutor;
use crate::nats::NatsSubscriber;

/// Worker that claims and executes refresh jobs.
pub struct Worker {
    /// Worker configuration.
    config: WorkerConfig,

    /// NATS subscriber for refresh notifications.
    subscriber: NatsSubscriber,

    /// Sync server HTTP client.
    client: SyncServerClient,

    /// Refresh executor.
    executor: Arc<RefreshExecutor>,

    /// Semaphore for concurrency control.
    semaphore: Arc<Semaphore>,
}

impl Worker {
    /// Create a new worker.
    pub async fn new(config: WorkerConfig) -> Result<Self> {
        // Connect to NATS
        let subscriber = NatsSubscriber::connect(
            &config.nats_url,
            &config.nats_stream,
            &config.nats_consumer,
        )
        .await?;

        // Create HTTP client
        let client = SyncServerClient::new(&config.server_url);

        // Create executor
        let executor = Arc::new(RefreshExecutor::new(
            client.clone(),
            config.worker_id.clone(),
        ));

        // Create semaphore for concurrency control
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_refreshes));

        Ok(Self {
            config,
            subscriber,
            client,
            executor,
            semaphore,
        })
    }

    /// Run the worker until cancelled.
    pub async fn run(&self) -> Result<()> {
        tracing::info!(
            worker_id = %self.config.worker_id,
            server_url = %self.config.server_url,
            max_concurrent = self.config.max_concurrent_refreshes,
            "Worker started"
        );

        self.process_notifications().await
    }

    /// Process refresh notifications from NATS.
    async fn process_notifications(&self) -> Result<()> {
        loop {
            // Wait for available slot
            let permit = self.semaphore.clone().acquire_owned().await?;

            // Receive notification
            match self.subscriber.receive().await? {
                Some((notification, msg)) => {
                    tracing::debug!(
                        job_id = notification.job_id,
                        source_id = notification.source_id,
                        slug = %notification.slug,
                        "Received refresh notification"
                    );

                    // Try to claim the job
                    match self
                        .client
                        .claim_job(notification.job_id, &self.config.worker_id)
                        .await?
                    {
                        ClaimResult::Claimed => {
                            tracing::debug!(job_id = notification.job_id, "Job claimed");

                            // Acknowledge NATS message
                            self.subscriber.ack(&msg).await?;

                            // Spawn task to run the refresh
                            let executor = self.executor.clone();

                            tokio::spawn(async move {
                                // Keep permit until done
                                let _permit = permit;

                                if let Err(e) = executor.execute(&notification).await {
                                    tracing::error!(
                                        job_id = notification.job_id,
                                        error = %e,
                                        "Refresh execution failed"
                                    );
                                }
                            });
                        }
                        ClaimResult::AlreadyClaimed => {
                            tracing::debug!(
                                job_id = notification.job_id,
                                "Job already claimed by another worker"
                            );

                            // Acknowledge message (another worker has it)
                            self.subscriber.ack(&msg).await?;

                            // Release permit immediately
                            drop(permit);
                        }
                        ClaimResult::Failed(error) => {
                            tracing::error!(
                                job_id = notification.job_id,
                                error = %error,
                                "Failed to claim job"
                            );

                            // Nack message for redelivery
                            self.subscriber.nack(&msg).await?;

                            // Release permit
                            drop(permit);
                        }
                    }
                }
                None => {
                    // No message, release permit and continue
                    drop(permit);
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config() {
        let config = WorkerConfig::default();
        assert!(!config.worker_id.is_empty());
        assert_eq!(config.max_concurrent_refreshes, 4);
    }
}
