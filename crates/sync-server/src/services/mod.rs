//! Business logic services.

pub mod job;
pub mod source;
pub mod sync;

pub use job::{ClaimOutcome, JobFilter, JobService};
pub use source::SourceService;
pub use sync::{DispatchMode, ResyncAllReceipt, ResyncReceipt, ResyncService, StatusUpdater, SyncGate};
