//! GeoJSON FeatureCollection driver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::drivers::fetch_payload;
use crate::error::DriverError;
use crate::registry::Driver;
use crate::source::{FetchSummary, GeometryKind, SourceKind, SourceSpec};

/// GeoJSON driver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeojsonSettings {
    /// Feature property holding the stable identifier. When set, features
    /// without it or sharing a value with an earlier feature are rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_field: Option<String>,

    /// Fetch timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for GeojsonSettings {
    fn default() -> Self {
        Self {
            id_field: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// GeoJSON FeatureCollection driver.
pub struct GeojsonDriver {
    client: reqwest::Client,
}

impl GeojsonDriver {
    /// Create a new GeoJSON driver.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Parse driver settings from the source spec.
    fn parse_settings(&self, spec: &SourceSpec) -> Result<GeojsonSettings, DriverError> {
        if spec.settings.is_null() {
            return Ok(GeojsonSettings::default());
        }
        serde_json::from_value(spec.settings.clone())
            .map_err(|e| DriverError::Settings(format!("Invalid geojson settings: {}", e)))
    }
}

impl Default for GeojsonDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for GeojsonDriver {
    fn kind(&self) -> SourceKind {
        SourceKind::Geojson
    }

    async fn fetch(&self, spec: &SourceSpec) -> Result<FetchSummary, DriverError> {
        let settings = self.parse_settings(spec)?;

        tracing::debug!(
            source = %spec.slug,
            uri = %spec.uri,
            timeout = settings.timeout_seconds,
            "Fetching GeoJSON payload"
        );

        let bytes = fetch_payload(&self.client, &spec.uri, settings.timeout_seconds).await?;
        summarize_feature_collection(&bytes, spec.geom_type, settings.id_field.as_deref())
    }
}

/// Walk a FeatureCollection and count accepted and rejected features.
///
/// A feature is rejected when its geometry is missing, its geometry type does
/// not match the declared one, or the identifying property is absent or
/// duplicated.
fn summarize_feature_collection(
    bytes: &[u8],
    geom_type: GeometryKind,
    id_field: Option<&str>,
) -> Result<FetchSummary, DriverError> {
    let document: Value = serde_json::from_slice(bytes)?;

    if document.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(DriverError::Parse(
            "Document is not a FeatureCollection".to_string(),
        ));
    }

    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| DriverError::Parse("Missing features array".to_string()))?;

    let expected = geom_type.geojson_type();
    let mut summary = FetchSummary::clean(0);
    let mut missing_geometry = 0i64;
    let mut mismatched = 0i64;
    let mut missing_id = 0i64;
    let mut duplicated = 0i64;
    let mut seen: HashSet<String> = HashSet::new();

    for feature in features {
        let geometry_type = feature
            .get("geometry")
            .and_then(|g| g.get("type"))
            .and_then(Value::as_str);

        match geometry_type {
            None => {
                missing_geometry += 1;
                continue;
            }
            Some(found) if found != expected => {
                mismatched += 1;
                continue;
            }
            Some(_) => {}
        }

        if let Some(field) = id_field {
            let id = feature
                .get("properties")
                .and_then(|p| p.get(field))
                .filter(|v| !v.is_null());

            match id {
                None => {
                    missing_id += 1;
                    continue;
                }
                Some(value) => {
                    if !seen.insert(value.to_string()) {
                        duplicated += 1;
                        continue;
                    }
                }
            }
        }

        summary.feature_count += 1;
    }

    summary.error_count = missing_geometry + mismatched + missing_id + duplicated;
    if missing_geometry > 0 {
        summary.push_message(format!("{} features without geometry", missing_geometry));
    }
    if mismatched > 0 {
        summary.push_message(format!(
            "{} features with geometry other than {}",
            mismatched, expected
        ));
    }
    if let Some(field) = id_field {
        if missing_id > 0 {
            summary.push_message(format!("{} features without '{}'", missing_id, field));
        }
        if duplicated > 0 {
            summary.push_message(format!("{} duplicate values for '{}'", duplicated, field));
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(features: &str) -> Vec<u8> {
        format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features).into_bytes()
    }

    fn point_feature(id: &str) -> String {
        format!(
            r#"{{"type":"Feature","geometry":{{"type":"Point","coordinates":[2.3,48.8]}},"properties":{{"code":"{}"}}}}"#,
            id
        )
    }

    #[test]
    fn test_clean_collection() {
        let bytes = collection(&format!("{},{}", point_feature("a"), point_feature("b")));
        let summary =
            summarize_feature_collection(&bytes, GeometryKind::Point, Some("code")).unwrap();

        assert_eq!(summary.feature_count, 2);
        assert_eq!(summary.error_count, 0);
        assert!(summary.messages.is_empty());
    }

    #[test]
    fn test_geometry_mismatch_counted() {
        let line = r#"{"type":"Feature","geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]},"properties":{}}"#;
        let bytes = collection(&format!("{},{}", point_feature("a"), line));
        let summary = summarize_feature_collection(&bytes, GeometryKind::Point, None).unwrap();

        assert_eq!(summary.feature_count, 1);
        assert_eq!(summary.error_count, 1);
        assert_eq!(
            summary.messages,
            vec!["1 features with geometry other than Point"]
        );
    }

    #[test]
    fn test_duplicate_ids_counted() {
        let bytes = collection(&format!(
            "{},{},{}",
            point_feature("a"),
            point_feature("a"),
            point_feature("b")
        ));
        let summary =
            summarize_feature_collection(&bytes, GeometryKind::Point, Some("code")).unwrap();

        assert_eq!(summary.feature_count, 2);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.messages, vec!["1 duplicate values for 'code'"]);
    }

    #[test]
    fn test_missing_geometry_counted() {
        let bare = r#"{"type":"Feature","geometry":null,"properties":{"code":"x"}}"#;
        let bytes = collection(bare);
        let summary = summarize_feature_collection(&bytes, GeometryKind::Point, None).unwrap();

        assert_eq!(summary.feature_count, 0);
        assert_eq!(summary.error_count, 1);
    }

    #[test]
    fn test_not_a_collection() {
        let bytes = br#"{"type":"Feature","geometry":null}"#;
        let result = summarize_feature_collection(bytes, GeometryKind::Point, None);
        assert!(matches!(result, Err(DriverError::Parse(_))));
    }

    #[test]
    fn test_settings_default_timeout() {
        let driver = GeojsonDriver::new();
        let spec = SourceSpec {
            slug: "towns".to_string(),
            kind: SourceKind::Geojson,
            geom_type: GeometryKind::Point,
            uri: "/tmp/towns.json".to_string(),
            settings: serde_json::json!({"id_field": "code"}),
        };

        let settings = driver.parse_settings(&spec).unwrap();
        assert_eq!(settings.id_field.as_deref(), Some("code"));
        assert_eq!(settings.timeout_seconds, 30);
    }
}
