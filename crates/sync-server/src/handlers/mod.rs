//! HTTP handlers for the geosync server API.
//!
//! This module contains all route handlers organized by domain.

pub mod database;
pub mod events;
pub mod health;
pub mod jobs;
pub mod resync;
pub mod sources;

pub use events::handle_event;
pub use health::{api_health, health_check};
