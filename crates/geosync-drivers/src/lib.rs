//! GeoSync Driver Library
//!
//! This crate provides the drivers the refresh worker uses to pull a
//! geodata source and summarize what it holds:
//!
//! - **GeoJSON**: FeatureCollection documents, with per-feature geometry
//!   and identifier validation
//! - **CSV**: delimited text carrying one point per row
//! - **WMTS**: capabilities endpoints, validated rather than ingested
//!
//! Drivers are registered in a [`registry::DriverRegistry`] keyed by
//! [`source::SourceKind`] and dispatched through the [`registry::Driver`]
//! trait.
//!
//! ## Example
//!
//! ```ignore
//! use geosync_drivers::{create_default_registry, SourceSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), geosync_drivers::DriverError> {
//!     let registry = create_default_registry();
//!     let spec: SourceSpec = serde_json::from_str(r#"{
//!         "slug": "towns",
//!         "kind": "geojson",
//!         "geom_type": "point",
//!         "uri": "https://example.org/towns.geojson"
//!     }"#)?;
//!     let summary = registry.fetch(&spec).await?;
//!     println!("{}", summary.report());
//!     Ok(())
//! }
//! ```

pub mod drivers;
pub mod error;
pub mod registry;
pub mod source;

pub use drivers::create_default_registry;
pub use error::DriverError;
pub use registry::{Driver, DriverRegistry};
pub use source::{FetchSummary, GeometryKind, SourceKind, SourceSpec};
