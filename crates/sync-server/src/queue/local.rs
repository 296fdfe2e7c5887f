//! In-process task queue.
//!
//! Fallback used when NATS is not configured: enqueued jobs run on the
//! server's own tokio runtime. Claims still go through the job table, so
//! behavior matches the distributed path apart from locality.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::AppResult;
use crate::queue::{RefreshNotification, TaskQueue};
use crate::refresh::RefreshRunner;

/// Task queue that runs refreshes on the local runtime.
pub struct LocalTaskQueue {
    runner: Arc<RefreshRunner>,
}

impl LocalTaskQueue {
    /// Create a new local task queue.
    pub fn new(runner: Arc<RefreshRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl TaskQueue for LocalTaskQueue {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn enqueue(&self, notification: &RefreshNotification) -> AppResult<()> {
        let runner = self.runner.clone();
        let owned = notification.clone();

        tokio::spawn(async move {
            if let Err(e) = runner.run(&owned).await {
                tracing::error!(
                    job_id = owned.job_id,
                    source = %owned.slug,
                    error = %e,
                    "Background refresh failed"
                );
            }
        });

        tracing::debug!(
            job_id = notification.job_id,
            source = %notification.slug,
            "Refresh spawned on local runtime"
        );

        Ok(())
    }

    async fn run_inline(&self, notification: &RefreshNotification) -> AppResult<()> {
        self.runner.run(notification).await
    }
}
