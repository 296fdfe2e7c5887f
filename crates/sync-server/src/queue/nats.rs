//! NATS JetStream task queue.
//!
//! Server publishes lightweight refresh notifications to a JetStream
//! subject; workers subscribe, claim the job through the server API, and
//! report results back. Inline runs bypass the stream entirely.

use async_nats::jetstream::{self, Context};
use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::queue::{RefreshNotification, TaskQueue, DEFAULT_STREAM, DEFAULT_SUBJECT};
use crate::refresh::RefreshRunner;

/// Task queue backed by NATS JetStream.
pub struct NatsTaskQueue {
    /// JetStream context.
    js: Context,

    /// Subject to publish to.
    subject: String,

    /// Runner for inline dispatch.
    runner: Arc<RefreshRunner>,
}

impl NatsTaskQueue {
    /// Create a new NATS task queue from an existing client.
    ///
    /// # Arguments
    ///
    /// * `client` - Connected NATS client
    /// * `runner` - Runner used for inline dispatch
    /// * `subject` - Subject to publish refresh notifications to
    /// * `stream_name` - JetStream stream name
    ///
    /// # Returns
    ///
    /// A new `NatsTaskQueue` or error if stream setup fails.
    pub async fn new(
        client: Arc<async_nats::Client>,
        runner: Arc<RefreshRunner>,
        subject: Option<&str>,
        stream_name: Option<&str>,
    ) -> AppResult<Self> {
        let subject = subject.unwrap_or(DEFAULT_SUBJECT).to_string();
        let stream = stream_name.unwrap_or(DEFAULT_STREAM);

        // Get JetStream context
        let js = jetstream::new((*client).clone());

        // Ensure stream exists
        Self::ensure_stream(&js, stream, &subject).await?;

        Ok(Self {
            js,
            subject,
            runner,
        })
    }

    /// Ensure the JetStream stream exists.
    async fn ensure_stream(js: &Context, stream: &str, subject: &str) -> AppResult<()> {
        // Try to get existing stream info
        match js.get_stream(stream).await {
            Ok(_) => {
                tracing::debug!(stream = %stream, "Using existing NATS stream");
                Ok(())
            }
            Err(_) => {
                // Create stream if it doesn't exist
                let config = jetstream::stream::Config {
                    name: stream.to_string(),
                    subjects: vec![subject.to_string()],
                    max_age: std::time::Duration::from_secs(3600), // 1 hour retention
                    storage: jetstream::stream::StorageType::File,
                    ..Default::default()
                };

                js.create_stream(config)
                    .await
                    .map_err(|e| AppError::Queue(e.to_string()))?;

                tracing::info!(stream = %stream, subject = %subject, "Created NATS stream");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl TaskQueue for NatsTaskQueue {
    fn name(&self) -> &'static str {
        "nats"
    }

    async fn enqueue(&self, notification: &RefreshNotification) -> AppResult<()> {
        let payload = serde_json::to_vec(notification)
            .map_err(|e| AppError::Queue(format!("Serialization error: {}", e)))?;

        self.js
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;

        tracing::debug!(
            job_id = notification.job_id,
            source_id = notification.source_id,
            source = %notification.slug,
            "Published refresh notification"
        );

        Ok(())
    }

    async fn run_inline(&self, notification: &RefreshNotification) -> AppResult<()> {
        self.runner.run(notification).await
    }
}
