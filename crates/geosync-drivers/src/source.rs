//! Source descriptors shared between the server and the drivers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DriverError;

/// Kind of geodata source, selects the driver used to refresh it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// GeoJSON FeatureCollection document.
    Geojson,
    /// Delimited text with one point per row.
    Csv,
    /// WMTS capabilities endpoint.
    Wmts,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Geojson => "geojson",
            SourceKind::Csv => "csv",
            SourceKind::Wmts => "wmts",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "geojson" => Ok(SourceKind::Geojson),
            "csv" => Ok(SourceKind::Csv),
            "wmts" => Ok(SourceKind::Wmts),
            other => Err(DriverError::UnknownKind(other.to_string())),
        }
    }
}

/// Geometry type a source is declared to carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Point,
    #[serde(rename = "linestring")]
    LineString,
    Polygon,
    #[serde(rename = "multipoint")]
    MultiPoint,
    #[serde(rename = "multilinestring")]
    MultiLineString,
    #[serde(rename = "multipolygon")]
    MultiPolygon,
}

impl GeometryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Point => "point",
            GeometryKind::LineString => "linestring",
            GeometryKind::Polygon => "polygon",
            GeometryKind::MultiPoint => "multipoint",
            GeometryKind::MultiLineString => "multilinestring",
            GeometryKind::MultiPolygon => "multipolygon",
        }
    }

    /// The `type` member a GeoJSON geometry of this kind carries.
    pub fn geojson_type(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::MultiPolygon => "MultiPolygon",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeometryKind {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" => Ok(GeometryKind::Point),
            "linestring" => Ok(GeometryKind::LineString),
            "polygon" => Ok(GeometryKind::Polygon),
            "multipoint" => Ok(GeometryKind::MultiPoint),
            "multilinestring" => Ok(GeometryKind::MultiLineString),
            "multipolygon" => Ok(GeometryKind::MultiPolygon),
            other => Err(DriverError::Settings(format!(
                "Unknown geometry type: {other}"
            ))),
        }
    }
}

/// Everything a driver needs to know about a source to refresh it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Stable identifier, used for logging only.
    pub slug: String,

    /// Driver selector.
    pub kind: SourceKind,

    /// Declared geometry type of the features.
    pub geom_type: GeometryKind,

    /// Where the payload lives. `http(s)://` URL or a filesystem path.
    pub uri: String,

    /// Kind-specific settings, interpreted by the driver.
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// Outcome of one refresh pass over a source payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchSummary {
    /// Features accepted.
    pub feature_count: i64,

    /// Rows or features rejected.
    pub error_count: i64,

    /// Human-readable report, empty when nothing noteworthy happened.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl FetchSummary {
    /// Summary for a pass that accepted every feature.
    pub fn clean(feature_count: i64) -> Self {
        Self {
            feature_count,
            error_count: 0,
            messages: Vec::new(),
        }
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Single-line report suitable for a job record.
    pub fn report(&self) -> String {
        if self.messages.is_empty() {
            format!(
                "{} features, {} errors",
                self.feature_count, self.error_count
            )
        } else {
            format!(
                "{} features, {} errors: {}",
                self.feature_count,
                self.error_count,
                self.messages.join("; ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_round_trip() {
        for kind in [SourceKind::Geojson, SourceKind::Csv, SourceKind::Wmts] {
            let parsed: SourceKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("shapefile".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_geometry_kind_serde() {
        let json = serde_json::to_string(&GeometryKind::MultiLineString).unwrap();
        assert_eq!(json, "\"multilinestring\"");

        let parsed: GeometryKind = serde_json::from_str("\"point\"").unwrap();
        assert_eq!(parsed, GeometryKind::Point);
    }

    #[test]
    fn test_geojson_type_casing() {
        assert_eq!(GeometryKind::LineString.geojson_type(), "LineString");
        assert_eq!(GeometryKind::MultiPolygon.geojson_type(), "MultiPolygon");
    }

    #[test]
    fn test_spec_settings_default() {
        let spec: SourceSpec = serde_json::from_str(
            r#"{"slug":"towns","kind":"geojson","geom_type":"point","uri":"/tmp/towns.json"}"#,
        )
        .unwrap();
        assert!(spec.settings.is_null());
    }

    #[test]
    fn test_summary_report() {
        let mut summary = FetchSummary::clean(120);
        assert_eq!(summary.report(), "120 features, 0 errors");

        summary.error_count = 3;
        summary.push_message("3 rows missing coordinates");
        assert_eq!(
            summary.report(),
            "120 features, 3 errors: 3 rows missing coordinates"
        );
    }
}
