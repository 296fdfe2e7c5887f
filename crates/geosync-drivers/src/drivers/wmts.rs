//! WMTS capabilities driver.
//!
//! Tile services expose no features to ingest. A refresh validates that the
//! capabilities document is reachable and still advertises the configured
//! layer.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::drivers::fetch_payload;
use crate::error::DriverError;
use crate::registry::Driver;
use crate::source::{FetchSummary, SourceKind, SourceSpec};

/// WMTS driver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WmtsSettings {
    /// Layer identifier the source renders. When set, the refresh fails if
    /// the capabilities no longer advertise it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,

    /// Fetch timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for WmtsSettings {
    fn default() -> Self {
        Self {
            layer: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// WMTS capabilities driver.
pub struct WmtsDriver {
    client: reqwest::Client,
}

impl WmtsDriver {
    /// Create a new WMTS driver.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Parse driver settings from the source spec.
    fn parse_settings(&self, spec: &SourceSpec) -> Result<WmtsSettings, DriverError> {
        if spec.settings.is_null() {
            return Ok(WmtsSettings::default());
        }
        serde_json::from_value(spec.settings.clone())
            .map_err(|e| DriverError::Settings(format!("Invalid wmts settings: {}", e)))
    }
}

impl Default for WmtsDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for WmtsDriver {
    fn kind(&self) -> SourceKind {
        SourceKind::Wmts
    }

    async fn fetch(&self, spec: &SourceSpec) -> Result<FetchSummary, DriverError> {
        let settings = self.parse_settings(spec)?;

        tracing::debug!(
            source = %spec.slug,
            uri = %spec.uri,
            layer = ?settings.layer,
            "Fetching WMTS capabilities"
        );

        let bytes = fetch_payload(&self.client, &spec.uri, settings.timeout_seconds).await?;
        let text = String::from_utf8(bytes)
            .map_err(|e| DriverError::Parse(format!("Capabilities are not UTF-8: {}", e)))?;
        summarize_capabilities(&text, settings.layer.as_deref())
    }
}

/// Scan a capabilities document and count the advertised layers.
fn summarize_capabilities(text: &str, layer: Option<&str>) -> Result<FetchSummary, DriverError> {
    if !text.contains("<Capabilities") {
        return Err(DriverError::Parse(
            "Document is not a WMTS capabilities document".to_string(),
        ));
    }

    let layer_open = Regex::new(r"<Layer[\s>]")
        .map_err(|e| DriverError::Parse(format!("Invalid layer pattern: {}", e)))?;
    let layer_count = layer_open.find_iter(text).count() as i64;

    if let Some(layer) = layer {
        let identifier = Regex::new(&format!(
            r"<ows:Identifier>\s*{}\s*</ows:Identifier>",
            regex::escape(layer)
        ))
        .map_err(|e| DriverError::Parse(format!("Invalid identifier pattern: {}", e)))?;

        if !identifier.is_match(text) {
            return Err(DriverError::Fetch(format!(
                "Layer '{}' not advertised by capabilities",
                layer
            )));
        }
    }

    let mut summary = FetchSummary::clean(layer_count);
    summary.push_message(format!("{} layers advertised", layer_count));
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPABILITIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Capabilities xmlns="http://www.opengis.net/wmts/1.0" xmlns:ows="http://www.opengis.net/ows/1.1">
  <Contents>
    <Layer>
      <ows:Identifier>ortho2023</ows:Identifier>
    </Layer>
    <Layer>
      <ows:Identifier>plan</ows:Identifier>
    </Layer>
  </Contents>
</Capabilities>"#;

    #[test]
    fn test_counts_layers() {
        let summary = summarize_capabilities(CAPABILITIES, None).unwrap();
        assert_eq!(summary.feature_count, 2);
        assert_eq!(summary.error_count, 0);
        assert_eq!(summary.messages, vec!["2 layers advertised"]);
    }

    #[test]
    fn test_configured_layer_present() {
        let summary = summarize_capabilities(CAPABILITIES, Some("plan")).unwrap();
        assert_eq!(summary.feature_count, 2);
    }

    #[test]
    fn test_configured_layer_missing() {
        let result = summarize_capabilities(CAPABILITIES, Some("cadastre"));
        assert!(matches!(result, Err(DriverError::Fetch(_))));
    }

    #[test]
    fn test_not_capabilities() {
        let result = summarize_capabilities("<html>service moved</html>", None);
        assert!(matches!(result, Err(DriverError::Parse(_))));
    }
}
