//! Database queries for the GeoSync server.
//!
//! This module contains database query functions organized by domain.

pub mod job;
pub mod source;
