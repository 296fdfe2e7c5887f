//! Application configuration for the GeoSync server.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// Environment variables are prefixed with `GEOSYNC_`:
/// - `GEOSYNC_HOST`: Server bind address (default: "0.0.0.0")
/// - `GEOSYNC_PORT`: Server port (default: 8090)
/// - `GEOSYNC_DEBUG`: Enable debug mode (default: false)
/// - `GEOSYNC_SERVER_NAME`: Server name for identification
/// - `GEOSYNC_PUBLIC_URL`: URL workers use to reach this server
/// - `GEOSYNC_NATS_URL`: NATS server URL (optional, inline fallback without it)
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable debug mode
    #[serde(default)]
    pub debug: bool,

    /// Server name for identification
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// URL workers use to reach this server (defaults to host:port)
    #[serde(default)]
    pub public_url: Option<String>,

    /// NATS URL (optional)
    #[serde(default)]
    pub nats_url: Option<String>,

    /// Disable the periodic refresh sweep
    #[serde(default)]
    pub disable_refresh_sweep: bool,

    /// Refresh sweep interval in seconds
    #[serde(default = "default_sweep_interval")]
    pub refresh_sweep_interval: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_server_name() -> String {
    "geosync-server".to_string()
}

fn default_sweep_interval() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are prefixed with `GEOSYNC_`.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("GEOSYNC_").from_env::<AppConfig>()
    }

    /// Get the server bind address as a string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL workers should use to call back into this server.
    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host, self.port))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
            server_name: default_server_name(),
            public_url: None,
            nats_url: None,
            disable_refresh_sweep: false,
            refresh_sweep_interval: default_sweep_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8090);
        assert!(!config.debug);
        assert_eq!(config.refresh_sweep_interval, 60);
    }

    #[test]
    fn test_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8090");
    }

    #[test]
    fn test_public_url_fallback() {
        let mut config = AppConfig::default();
        assert_eq!(config.public_url(), "http://0.0.0.0:8090");

        config.public_url = Some("http://geosync.internal:8090".to_string());
        assert_eq!(config.public_url(), "http://geosync.internal:8090");
    }
}
