//! CLI configuration and context management.
//!
//! Contexts name sync servers so the CLI can be pointed at local or
//! remote deployments without repeating URLs. Persisted as YAML at
//! `~/.geosync/config.yaml`.

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// A named server context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// Sync server URL (e.g., http://localhost:8090)
    pub server_url: String,
}

impl Context {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
        }
    }
}

/// Persisted CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Name of the active context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_context: Option<String>,

    /// Named contexts.
    #[serde(default)]
    pub contexts: BTreeMap<String, Context>,
}

impl Config {
    fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".geosync").join("config.yaml"))
    }

    /// Load the configuration, or an empty one when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(&path).context(format!("Failed to read config: {:?}", path))?;
        let config =
            serde_yaml::from_str(&content).context(format!("Failed to parse config: {:?}", path))?;
        Ok(config)
    }

    /// Persist the configuration.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = serde_yaml::to_string(self)?;
        fs::write(&path, content).context(format!("Failed to write config: {:?}", path))?;
        Ok(())
    }

    /// The active context, if any.
    pub fn get_current_context(&self) -> Option<(&String, &Context)> {
        let name = self.current_context.as_ref()?;
        self.contexts.get_key_value(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_yaml_roundtrip() {
        let mut config = Config::default();
        config
            .contexts
            .insert("local".to_string(), Context::new("http://localhost:8090"));
        config.current_context = Some("local".to_string());

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

        let (name, ctx) = parsed.get_current_context().unwrap();
        assert_eq!(name, "local");
        assert_eq!(ctx.server_url, "http://localhost:8090");
    }

    #[test]
    fn empty_config_has_no_current_context() {
        let config = Config::default();
        assert!(config.get_current_context().is_none());

        let parsed: Config = serde_yaml::from_str("{}").unwrap();
        assert!(parsed.get_current_context().is_none());
    }
}
