//! GeoSync Server Library
//!
//! This crate provides the synchronization server for geosync, handling:
//!
//! - **Source Registry**: Register and manage geodata sources (GeoJSON, CSV, WMTS)
//! - **Resync Orchestration**: Gate, claim, and dispatch refresh jobs
//! - **Job Tracking**: Persist per-attempt refresh reports
//! - **Event Processing**: Handle worker claims and outcome reports
//! - **Refresh Sweep**: Re-dispatch sources on their configured interval
//!
//! ## Architecture
//!
//! Source and job state lives in PostgreSQL; the `status` column of a source
//! is the sync gate and every gate transition is a compare-and-set. NATS
//! JetStream carries refresh notifications to workers; without NATS the
//! server falls back to in-process dispatch.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from environment variables
//! - [`db`]: Database connectivity, models, and queries
//! - [`error`]: Custom error types with Axum integration
//! - [`handlers`]: HTTP route handlers
//! - [`queue`]: Refresh dispatch (NATS JetStream or in-process)
//! - [`refresh`]: Refresh execution over the driver registry
//! - [`services`]: Source, sync, and job services
//! - [`state`]: Shared application state
//! - [`sweep`]: Periodic refresh sweep
//!
//! ## Example
//!
//! ```ignore
//! use geosync_server::{
//!     config::{AppConfig, DatabaseConfig},
//!     db::create_pool,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app_config = AppConfig::from_env()?;
//!     let db_config = DatabaseConfig::from_env()?;
//!     let db_pool = create_pool(&db_config).await?;
//!     // ... build services, router, and run the server
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod queue;
pub mod refresh;
pub mod services;
pub mod state;
pub mod sweep;

pub use error::{AppError, AppResult};
