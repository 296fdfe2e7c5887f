//! Database models for the GeoSync server.
//!
//! This module contains model definitions for all database tables.

pub mod job;
pub mod source;

pub use job::*;
pub use source::*;
