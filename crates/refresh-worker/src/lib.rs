//! GeoSync Refresh Worker
//!
//! Executes source refresh jobs received from the sync server via NATS.
//!
//! This crate provides:
//! - NATS JetStream subscriber for refresh notifications
//! - Sync server HTTP client for job claiming and result reporting
//! - Refresh executor backed by the source driver registry

pub mod client;
pub mod config;
pub mod executor;
pub mod nats;
pub mod worker;

pub use config::WorkerConfig;
pub use worker::Worker;
