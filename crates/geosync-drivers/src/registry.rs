//! Driver registry and dispatch.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DriverError;
use crate::source::{FetchSummary, SourceKind, SourceSpec};

/// Driver trait for implementing source refreshers.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Returns the source kind this driver handles.
    fn kind(&self) -> SourceKind;

    /// Fetch the source payload and summarize what it holds.
    async fn fetch(&self, spec: &SourceSpec) -> Result<FetchSummary, DriverError>;
}

/// Registry of available drivers.
pub struct DriverRegistry {
    drivers: HashMap<SourceKind, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// Create a new empty driver registry.
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Register a driver.
    pub fn register<D: Driver + 'static>(&mut self, driver: D) {
        let kind = driver.kind();
        self.drivers.insert(kind, Arc::new(driver));
    }

    /// Get a driver by kind.
    pub fn get(&self, kind: SourceKind) -> Option<Arc<dyn Driver>> {
        self.drivers.get(&kind).cloned()
    }

    /// Check if a driver is registered.
    pub fn has(&self, kind: SourceKind) -> bool {
        self.drivers.contains_key(&kind)
    }

    /// List all registered source kinds.
    pub fn list(&self) -> Vec<SourceKind> {
        self.drivers.keys().copied().collect()
    }

    /// Fetch a source through the driver registered for its kind.
    pub async fn fetch(&self, spec: &SourceSpec) -> Result<FetchSummary, DriverError> {
        let driver = self
            .get(spec.kind)
            .ok_or_else(|| DriverError::UnknownKind(spec.kind.to_string()))?;
        driver.fetch(spec).await
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::GeometryKind;

    struct MockDriver;

    #[async_trait]
    impl Driver for MockDriver {
        fn kind(&self) -> SourceKind {
            SourceKind::Geojson
        }

        async fn fetch(&self, _spec: &SourceSpec) -> Result<FetchSummary, DriverError> {
            Ok(FetchSummary::clean(7))
        }
    }

    fn spec(kind: SourceKind) -> SourceSpec {
        SourceSpec {
            slug: "towns".to_string(),
            kind,
            geom_type: GeometryKind::Point,
            uri: "/tmp/towns.json".to_string(),
            settings: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_registry_new() {
        let registry = DriverRegistry::new();
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_registry_register() {
        let mut registry = DriverRegistry::new();
        registry.register(MockDriver);

        assert!(registry.has(SourceKind::Geojson));
        assert!(!registry.has(SourceKind::Wmts));
        assert_eq!(registry.list(), vec![SourceKind::Geojson]);
    }

    #[tokio::test]
    async fn test_registry_fetch() {
        let mut registry = DriverRegistry::new();
        registry.register(MockDriver);

        let summary = registry.fetch(&spec(SourceKind::Geojson)).await.unwrap();
        assert_eq!(summary.feature_count, 7);
    }

    #[tokio::test]
    async fn test_registry_fetch_unknown_kind() {
        let registry = DriverRegistry::new();
        let result = registry.fetch(&spec(SourceKind::Csv)).await;
        assert!(matches!(result, Err(DriverError::UnknownKind(_))));
    }
}
