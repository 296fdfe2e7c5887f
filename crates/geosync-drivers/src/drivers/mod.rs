//! Built-in driver implementations.
//!
//! This module provides drivers for the supported source kinds:
//! - `geojson` - GeoJSON FeatureCollection documents
//! - `csv` - Delimited text files carrying one point per row
//! - `wmts` - WMTS capabilities endpoints

mod csv;
mod geojson;
mod wmts;

pub use self::csv::CsvDriver;
pub use self::geojson::GeojsonDriver;
pub use self::wmts::WmtsDriver;

use std::time::Duration;

use crate::error::DriverError;
use crate::registry::DriverRegistry;

/// Create a driver registry with all built-in drivers registered.
pub fn create_default_registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();

    registry.register(GeojsonDriver::new());
    registry.register(CsvDriver::new());
    registry.register(WmtsDriver::new());

    registry
}

/// Retrieve a source payload from an `http(s)://` URL or a filesystem path.
pub(crate) async fn fetch_payload(
    client: &reqwest::Client,
    uri: &str,
    timeout_seconds: u64,
) -> Result<Vec<u8>, DriverError> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        let response = client
            .get(uri)
            .timeout(Duration::from_secs(timeout_seconds))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DriverError::Timeout(timeout_seconds)
                } else {
                    DriverError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::Fetch(format!("HTTP {status} from {uri}")));
        }

        Ok(response.bytes().await?.to_vec())
    } else {
        match tokio::time::timeout(
            Duration::from_secs(timeout_seconds),
            tokio::fs::read(uri),
        )
        .await
        {
            Ok(read) => Ok(read?),
            Err(_) => Err(DriverError::Timeout(timeout_seconds)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_registry_covers_all_kinds() {
        use crate::source::SourceKind;

        let registry = create_default_registry();
        assert!(registry.has(SourceKind::Geojson));
        assert!(registry.has(SourceKind::Csv));
        assert!(registry.has(SourceKind::Wmts));
    }

    #[tokio::test]
    async fn test_fetch_payload_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"payload bytes").unwrap();

        let client = reqwest::Client::new();
        let bytes = fetch_payload(&client, file.path().to_str().unwrap(), 5)
            .await
            .unwrap();
        assert_eq!(bytes, b"payload bytes");
    }

    #[tokio::test]
    async fn test_fetch_payload_missing_file() {
        let client = reqwest::Client::new();
        let result = fetch_payload(&client, "/nonexistent/towns.json", 5).await;
        assert!(matches!(result, Err(DriverError::Io(_))));
    }
}
