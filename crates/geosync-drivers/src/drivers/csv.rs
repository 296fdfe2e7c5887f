//! Delimited-text point driver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::drivers::fetch_payload;
use crate::error::DriverError;
use crate::registry::Driver;
use crate::source::{FetchSummary, GeometryKind, SourceKind, SourceSpec};

/// CSV driver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvSettings {
    /// Header name of the longitude column.
    #[serde(default = "default_lng_field")]
    pub lng_field: String,

    /// Header name of the latitude column.
    #[serde(default = "default_lat_field")]
    pub lat_field: String,

    /// Field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Fetch timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_lng_field() -> String {
    "lng".to_string()
}

fn default_lat_field() -> String {
    "lat".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self {
            lng_field: default_lng_field(),
            lat_field: default_lat_field(),
            delimiter: default_delimiter(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Delimited-text point driver.
pub struct CsvDriver {
    client: reqwest::Client,
}

impl CsvDriver {
    /// Create a new CSV driver.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Parse driver settings from the source spec.
    fn parse_settings(&self, spec: &SourceSpec) -> Result<CsvSettings, DriverError> {
        if spec.settings.is_null() {
            return Ok(CsvSettings::default());
        }
        serde_json::from_value(spec.settings.clone())
            .map_err(|e| DriverError::Settings(format!("Invalid csv settings: {}", e)))
    }
}

impl Default for CsvDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for CsvDriver {
    fn kind(&self) -> SourceKind {
        SourceKind::Csv
    }

    async fn fetch(&self, spec: &SourceSpec) -> Result<FetchSummary, DriverError> {
        if spec.geom_type != GeometryKind::Point {
            return Err(DriverError::Settings(format!(
                "CSV sources carry point geometries, declared {}",
                spec.geom_type
            )));
        }

        let settings = self.parse_settings(spec)?;

        tracing::debug!(
            source = %spec.slug,
            uri = %spec.uri,
            lng_field = %settings.lng_field,
            lat_field = %settings.lat_field,
            "Fetching CSV payload"
        );

        let bytes = fetch_payload(&self.client, &spec.uri, settings.timeout_seconds).await?;
        let text = String::from_utf8(bytes)
            .map_err(|e| DriverError::Parse(format!("Payload is not UTF-8: {}", e)))?;
        summarize_rows(&text, &settings)
    }
}

/// Split one row on the delimiter, honoring double-quoted fields.
fn split_row(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == delimiter {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }

    fields.push(current);
    fields
}

fn parse_coordinate(field: Option<&String>) -> Option<f64> {
    field.and_then(|f| f.trim().parse::<f64>().ok())
}

/// Walk the rows and count those carrying a usable point.
///
/// The first non-empty line is the header. A row is rejected when either
/// coordinate is missing, unparseable, or out of range.
fn summarize_rows(text: &str, settings: &CsvSettings) -> Result<FetchSummary, DriverError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| DriverError::Parse("Empty document".to_string()))?;
    let columns = split_row(header, settings.delimiter);

    let column_index = |name: &str| -> Result<usize, DriverError> {
        columns
            .iter()
            .position(|c| c.trim() == name)
            .ok_or_else(|| DriverError::Parse(format!("Column '{}' not found in header", name)))
    };
    let lng_index = column_index(&settings.lng_field)?;
    let lat_index = column_index(&settings.lat_field)?;

    let mut summary = FetchSummary::clean(0);
    let mut rejected = 0i64;

    for line in lines {
        let row = split_row(line, settings.delimiter);
        let lng = parse_coordinate(row.get(lng_index));
        let lat = parse_coordinate(row.get(lat_index));

        match (lng, lat) {
            (Some(lng), Some(lat))
                if (-180.0..=180.0).contains(&lng) && (-90.0..=90.0).contains(&lat) =>
            {
                summary.feature_count += 1;
            }
            _ => rejected += 1,
        }
    }

    summary.error_count = rejected;
    if rejected > 0 {
        summary.push_message(format!("{} rows with invalid coordinates", rejected));
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_rows() {
        let text = "name,lng,lat\nParis,2.35,48.85\nLyon,4.84,45.76\n";
        let summary = summarize_rows(text, &CsvSettings::default()).unwrap();

        assert_eq!(summary.feature_count, 2);
        assert_eq!(summary.error_count, 0);
    }

    #[test]
    fn test_invalid_coordinates_counted() {
        let text = "name,lng,lat\nParis,2.35,48.85\nNowhere,999,48.85\nBroken,abc,45.76\n";
        let summary = summarize_rows(text, &CsvSettings::default()).unwrap();

        assert_eq!(summary.feature_count, 1);
        assert_eq!(summary.error_count, 2);
        assert_eq!(summary.messages, vec!["2 rows with invalid coordinates"]);
    }

    #[test]
    fn test_missing_column() {
        let text = "name,x,y\nParis,2.35,48.85\n";
        let result = summarize_rows(text, &CsvSettings::default());
        assert!(matches!(result, Err(DriverError::Parse(_))));
    }

    #[test]
    fn test_custom_fields_and_delimiter() {
        let settings = CsvSettings {
            lng_field: "longitude".to_string(),
            lat_field: "latitude".to_string(),
            delimiter: ';',
            ..CsvSettings::default()
        };
        let text = "name;longitude;latitude\nParis;2.35;48.85\n";
        let summary = summarize_rows(text, &settings).unwrap();

        assert_eq!(summary.feature_count, 1);
    }

    #[test]
    fn test_quoted_field_with_delimiter() {
        let text = "name,lng,lat\n\"Paris, France\",2.35,48.85\n";
        let summary = summarize_rows(text, &CsvSettings::default()).unwrap();

        assert_eq!(summary.feature_count, 1);
        assert_eq!(summary.error_count, 0);
    }

    #[tokio::test]
    async fn test_rejects_non_point_geometry() {
        let driver = CsvDriver::new();
        let spec = SourceSpec {
            slug: "roads".to_string(),
            kind: SourceKind::Csv,
            geom_type: GeometryKind::LineString,
            uri: "/tmp/roads.csv".to_string(),
            settings: serde_json::Value::Null,
        };

        let result = driver.fetch(&spec).await;
        assert!(matches!(result, Err(DriverError::Settings(_))));
    }
}
