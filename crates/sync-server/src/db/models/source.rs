//! Source database model.
//!
//! A source row describes one external geodata feed and carries the sync
//! gate: its `status` column records whether a refresh currently holds it.

use chrono::{DateTime, Utc};
use geosync_drivers::{GeometryKind, SourceKind, SourceSpec};
use serde::{Deserialize, Serialize};

/// Synchronization status of a source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceStatus {
    /// Never refreshed, or reset after an interrupted run.
    Idle,
    /// A refresh holds the source.
    Running,
    /// Last refresh succeeded.
    Done,
    /// Last refresh failed.
    Failed,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Idle => "IDLE",
            SourceStatus::Running => "RUNNING",
            SourceStatus::Done => "DONE",
            SourceStatus::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for SourceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDLE" => Ok(SourceStatus::Idle),
            "RUNNING" => Ok(SourceStatus::Running),
            "DONE" => Ok(SourceStatus::Done),
            "FAILED" => Ok(SourceStatus::Failed),
            _ => Err(format!("Unknown source status: {}", s)),
        }
    }
}

/// Source entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub kind: SourceKind,
    pub geom_type: GeometryKind,
    pub uri: String,
    pub settings: serde_json::Value,
    pub status: SourceStatus,
    pub refresh_interval_minutes: Option<i32>,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    /// Build the driver-facing spec for this source.
    pub fn spec(&self) -> SourceSpec {
        SourceSpec {
            slug: self.slug.clone(),
            kind: self.kind,
            geom_type: self.geom_type,
            uri: self.uri.clone(),
            settings: self.settings.clone(),
        }
    }
}

/// Request to register a new source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSourceRequest {
    pub name: String,

    /// Stable identifier, derived from the name when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    pub kind: SourceKind,
    pub geom_type: GeometryKind,
    pub uri: String,

    #[serde(default)]
    pub settings: serde_json::Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval_minutes: Option<i32>,
}

impl CreateSourceRequest {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("'name' must not be empty".to_string());
        }
        if self.uri.trim().is_empty() {
            return Err("'uri' must not be empty".to_string());
        }
        if let Some(interval) = self.refresh_interval_minutes {
            if interval <= 0 {
                return Err("'refresh_interval_minutes' must be positive".to_string());
            }
        }
        Ok(())
    }
}

/// Request to update an existing source. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSourceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval_minutes: Option<i32>,
}

/// Source response (IDs stringified for JSON consumers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub kind: SourceKind,
    pub geom_type: GeometryKind,
    pub uri: String,
    pub settings: serde_json::Value,
    pub status: SourceStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval_minutes: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Source> for SourceResponse {
    fn from(source: Source) -> Self {
        Self {
            id: source.id.to_string(),
            name: source.name,
            slug: source.slug,
            kind: source.kind,
            geom_type: source.geom_type,
            uri: source.uri,
            settings: source.settings,
            status: source.status,
            refresh_interval_minutes: source.refresh_interval_minutes,
            last_refresh_at: source.last_refresh_at,
            created_at: source.created_at,
            updated_at: source.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(status: SourceStatus) -> Source {
        Source {
            id: 12345,
            name: "Towns".to_string(),
            slug: "towns".to_string(),
            kind: SourceKind::Geojson,
            geom_type: GeometryKind::Point,
            uri: "https://example.org/towns.geojson".to_string(),
            settings: serde_json::json!({"id_field": "code"}),
            status,
            refresh_interval_minutes: Some(60),
            last_refresh_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            SourceStatus::Idle,
            SourceStatus::Running,
            SourceStatus::Done,
            SourceStatus::Failed,
        ] {
            let parsed: SourceStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("PAUSED".parse::<SourceStatus>().is_err());
    }

    #[test]
    fn test_status_serde_screaming() {
        let json = serde_json::to_string(&SourceStatus::Running).unwrap();
        assert_eq!(json, "\"RUNNING\"");
    }

    #[test]
    fn test_spec_conversion() {
        let spec = source(SourceStatus::Idle).spec();
        assert_eq!(spec.slug, "towns");
        assert_eq!(spec.kind, SourceKind::Geojson);
        assert_eq!(spec.settings["id_field"], "code");
    }

    #[test]
    fn test_create_request_validation() {
        let mut request = CreateSourceRequest {
            name: "Towns".to_string(),
            slug: None,
            kind: SourceKind::Geojson,
            geom_type: GeometryKind::Point,
            uri: "https://example.org/towns.geojson".to_string(),
            settings: serde_json::Value::Null,
            refresh_interval_minutes: None,
        };
        assert!(request.validate().is_ok());

        request.name = "  ".to_string();
        assert!(request.validate().is_err());

        request.name = "Towns".to_string();
        request.refresh_interval_minutes = Some(0);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_response_stringifies_id() {
        let response = SourceResponse::from(source(SourceStatus::Done));
        assert_eq!(response.id, "12345");

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"id\":\"12345\""));
        assert!(json.contains("\"status\":\"DONE\""));
    }
}
