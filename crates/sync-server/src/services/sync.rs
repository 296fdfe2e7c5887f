//! Sync gate and resync orchestration.
//!
//! A source whose status is RUNNING is held by a refresh and refuses
//! non-forced resyncs. The gate has a pure read side ([`SyncGate`]) and a
//! write side ([`StatusUpdater`]); the write is a compare-and-set, so two
//! resyncs racing past the read cannot both dispatch.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::models::{JobStatus, Source, SourceStatus};
use crate::db::queries;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::queue::{RefreshNotification, TaskQueue};
use crate::services::job::JobService;
use crate::services::source::SourceService;

/// Read side of the sync gate. Pure, no side effects.
pub struct SyncGate;

impl SyncGate {
    /// Whether a non-forced resync would be admitted for this status.
    pub fn can_sync(status: SourceStatus) -> bool {
        status != SourceStatus::Running
    }

    /// Refuse a source that a refresh still holds.
    pub fn check(source: &Source) -> AppResult<()> {
        if Self::can_sync(source.status) {
            Ok(())
        } else {
            Err(AppError::source_busy())
        }
    }

    /// Refuse if any source is held. When this fails nothing has been
    /// dispatched for any of them.
    pub fn check_all<'a, I>(sources: I) -> AppResult<()>
    where
        I: IntoIterator<Item = &'a Source>,
    {
        for source in sources {
            Self::check(source)?;
        }
        Ok(())
    }
}

/// Write side of the sync gate.
#[derive(Clone)]
pub struct StatusUpdater {
    db: DbPool,
}

impl StatusUpdater {
    /// Create a new status updater.
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Take the gate for a source. Compare-and-set unless forced.
    ///
    /// Returns whether this caller took it.
    pub async fn mark_running(&self, source_id: i64, force: bool) -> AppResult<bool> {
        queries::source::mark_running(&self.db, source_id, force).await
    }

    /// Set a source's status outright.
    pub async fn update(&self, source_id: i64, status: SourceStatus) -> AppResult<()> {
        if !queries::source::update_status(&self.db, source_id, status).await? {
            return Err(AppError::NotFound(format!(
                "Source not found: {}",
                source_id
            )));
        }
        Ok(())
    }
}

/// How a refresh was dispatched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Ran on the request's own task, receipt carries the final status.
    Inline,
    /// Handed to the queue, receipt status is "queued".
    Queued,
}

/// Receipt for one dispatched refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResyncReceipt {
    pub source_id: String,
    pub slug: String,
    pub job_id: String,
    pub mode: DispatchMode,
    pub status: String,
}

/// Receipt for a resync of every source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResyncAllReceipt {
    pub total: usize,
    pub receipts: Vec<ResyncReceipt>,
}

/// Resync orchestration service.
#[derive(Clone)]
pub struct ResyncService {
    db: DbPool,
    sources: SourceService,
    updater: StatusUpdater,
    jobs: JobService,
    queue: Arc<dyn TaskQueue>,
    server_url: String,
}

impl ResyncService {
    /// Create a new resync service.
    pub fn new(db: DbPool, queue: Arc<dyn TaskQueue>, server_url: impl Into<String>) -> Self {
        let sources = SourceService::new(db.clone());
        let updater = StatusUpdater::new(db.clone());
        let jobs = JobService::new(db.clone());
        Self {
            db,
            sources,
            updater,
            jobs,
            queue,
            server_url: server_url.into(),
        }
    }

    /// Resync one source by id.
    ///
    /// Refuses with the busy error when the source is held and the request
    /// is not forced. With `sync` the refresh runs before this returns.
    pub async fn resync(&self, source_id: i64, sync: bool, force: bool) -> AppResult<ResyncReceipt> {
        let source = self.sources.get(source_id).await?;
        self.dispatch(&source, sync, force).await
    }

    /// Resync one source by id-or-slug reference.
    pub async fn resync_by_ref(
        &self,
        reference: &str,
        sync: bool,
        force: bool,
    ) -> AppResult<ResyncReceipt> {
        let source = self.sources.resolve(reference).await?;
        self.dispatch(&source, sync, force).await
    }

    /// Resync every source.
    ///
    /// Refuses outright when any source is held and the run is not forced;
    /// in that case nothing is dispatched for any source.
    pub async fn resync_all(&self, sync: bool, force: bool) -> AppResult<ResyncAllReceipt> {
        let sources = queries::source::list_sources(&self.db, None, None).await?;

        if !force {
            SyncGate::check_all(&sources)?;
        }

        let mut receipts = Vec::with_capacity(sources.len());
        for source in &sources {
            receipts.push(self.dispatch(source, sync, force).await?);
        }

        tracing::info!(total = receipts.len(), sync, force, "Resync-all dispatched");

        Ok(ResyncAllReceipt {
            total: receipts.len(),
            receipts,
        })
    }

    /// Gate, hold, record, dispatch.
    async fn dispatch(&self, source: &Source, sync: bool, force: bool) -> AppResult<ResyncReceipt> {
        if !force {
            SyncGate::check(source)?;
        }

        // The loaded row may be stale. Losing the flip means a concurrent
        // resync took the gate between our read and now.
        if !self.updater.mark_running(source.id, force).await? && !force {
            return Err(AppError::source_busy());
        }

        let job_id = queries::job::insert_job(&self.db, source.id).await?;
        let notification = RefreshNotification {
            job_id,
            source_id: source.id,
            slug: source.slug.clone(),
            server_url: self.server_url.clone(),
        };

        if sync {
            if let Err(e) = self.queue.run_inline(&notification).await {
                self.rollback_dispatch(job_id, source.id, &e).await?;
                return Err(e);
            }

            let status = match self.jobs.final_status(job_id).await? {
                JobStatus::Success => "success",
                JobStatus::Failure => "failure",
                JobStatus::Pending | JobStatus::Running => "running",
            };

            Ok(ResyncReceipt {
                source_id: source.id.to_string(),
                slug: source.slug.clone(),
                job_id: job_id.to_string(),
                mode: DispatchMode::Inline,
                status: status.to_string(),
            })
        } else {
            if let Err(e) = self.queue.enqueue(&notification).await {
                self.rollback_dispatch(job_id, source.id, &e).await?;
                return Err(e);
            }

            tracing::info!(
                source = %source.slug,
                job_id,
                queue = self.queue.name(),
                "Refresh queued"
            );

            Ok(ResyncReceipt {
                source_id: source.id.to_string(),
                slug: source.slug.clone(),
                job_id: job_id.to_string(),
                mode: DispatchMode::Queued,
                status: "queued".to_string(),
            })
        }
    }

    /// Fail the job and release the source after a dispatch error.
    async fn rollback_dispatch(&self, job_id: i64, source_id: i64, error: &AppError) -> AppResult<()> {
        self.jobs
            .abandon(job_id, &format!("Dispatch failed: {}", error))
            .await?;
        self.updater.update(source_id, SourceStatus::Failed).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use geosync_drivers::{GeometryKind, SourceKind};

    fn source(slug: &str, status: SourceStatus) -> Source {
        Source {
            id: 1,
            name: slug.to_string(),
            slug: slug.to_string(),
            kind: SourceKind::Geojson,
            geom_type: GeometryKind::Point,
            uri: format!("/data/{}.geojson", slug),
            settings: serde_json::json!({}),
            status,
            refresh_interval_minutes: None,
            last_refresh_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_sync_false_only_for_running() {
        assert!(SyncGate::can_sync(SourceStatus::Idle));
        assert!(SyncGate::can_sync(SourceStatus::Done));
        assert!(SyncGate::can_sync(SourceStatus::Failed));
        assert!(!SyncGate::can_sync(SourceStatus::Running));
    }

    #[test]
    fn test_gate_admits_idle_source() {
        assert!(SyncGate::check(&source("towns", SourceStatus::Idle)).is_ok());
        assert!(SyncGate::check(&source("towns", SourceStatus::Done)).is_ok());
        assert!(SyncGate::check(&source("towns", SourceStatus::Failed)).is_ok());
    }

    #[test]
    fn test_gate_refuses_running_source() {
        let err = SyncGate::check(&source("towns", SourceStatus::Running)).unwrap_err();
        assert!(matches!(err, AppError::SyncConflict(_)));
        assert_eq!(err.to_string(), "One job is still running on this source");
    }

    #[test]
    fn test_gate_check_all_refuses_on_any_running() {
        let sources = vec![
            source("towns", SourceStatus::Idle),
            source("roads", SourceStatus::Running),
            source("rivers", SourceStatus::Done),
        ];
        assert!(matches!(
            SyncGate::check_all(&sources),
            Err(AppError::SyncConflict(_))
        ));
    }

    #[test]
    fn test_gate_check_all_admits_when_none_running() {
        let sources = vec![
            source("towns", SourceStatus::Idle),
            source("rivers", SourceStatus::Done),
        ];
        assert!(SyncGate::check_all(&sources).is_ok());
        assert!(SyncGate::check_all(&[]).is_ok());
    }

    #[test]
    fn test_dispatch_mode_serde() {
        assert_eq!(
            serde_json::to_string(&DispatchMode::Inline).unwrap(),
            "\"inline\""
        );
        assert_eq!(
            serde_json::to_string(&DispatchMode::Queued).unwrap(),
            "\"queued\""
        );
    }

    #[test]
    fn test_receipt_serialization() {
        let receipt = ResyncReceipt {
            source_id: "12345".to_string(),
            slug: "towns".to_string(),
            job_id: "98765".to_string(),
            mode: DispatchMode::Queued,
            status: "queued".to_string(),
        };

        let json = serde_json::to_string(&receipt).unwrap();
        assert!(json.contains("\"source_id\":\"12345\""));
        assert!(json.contains("\"job_id\":\"98765\""));
        assert!(json.contains("\"mode\":\"queued\""));
    }
}
