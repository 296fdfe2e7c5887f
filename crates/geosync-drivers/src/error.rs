//! Driver error types.

use thiserror::Error;

/// Errors that can occur while fetching a source payload.
#[derive(Debug, Error)]
pub enum DriverError {
    /// No driver registered for the requested source kind.
    #[error("No driver for source kind: {0}")]
    UnknownKind(String),

    /// Kind-specific settings are missing or malformed.
    #[error("Settings error: {0}")]
    Settings(String),

    /// The payload could not be retrieved.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The payload was retrieved but could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Fetch timed out.
    #[error("Fetch timed out after {0} seconds")]
    Timeout(u64),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DriverError {
    fn from(e: std::io::Error) -> Self {
        DriverError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(e: serde_json::Error) -> Self {
        DriverError::Parse(e.to_string())
    }
}

impl From<reqwest::Error> for DriverError {
    fn from(e: reqwest::Error) -> Self {
        DriverError::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DriverError::UnknownKind("shapefile".to_string());
        assert_eq!(err.to_string(), "No driver for source kind: shapefile");

        let err = DriverError::Timeout(30);
        assert_eq!(err.to_string(), "Fetch timed out after 30 seconds");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let drv_err: DriverError = io_err.into();
        assert!(matches!(drv_err, DriverError::Io(_)));
    }
}
