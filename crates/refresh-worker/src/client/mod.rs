//! HTTP client for the sync server.

mod server;

pub use server::{ClaimResult, SourceDetail, SyncServerClient, WorkerEvent};
