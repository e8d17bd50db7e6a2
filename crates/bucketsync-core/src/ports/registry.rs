//! Provider registry
//!
//! Maps provider names to backend constructors. Providers are registered
//! explicitly at startup; nothing is discovered by naming convention.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::BucketConfig;
use crate::domain::DomainError;

use super::storage_backend::IStorageBackend;

/// Constructor for a backend from its bucket configuration.
pub type BackendFactory =
    Box<dyn Fn(&BucketConfig) -> anyhow::Result<Arc<dyn IStorageBackend>> + Send + Sync>;

/// Provider name → backend constructor.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name` (case-insensitive), replacing any
    /// earlier registration.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&BucketConfig) -> anyhow::Result<Arc<dyn IStorageBackend>> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.to_ascii_lowercase(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered provider names, sorted.
    pub fn providers(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct the backend named by `config.provider`.
    pub fn create(&self, config: &BucketConfig) -> anyhow::Result<Arc<dyn IStorageBackend>> {
        let factory = self
            .factories
            .get(&config.provider.to_ascii_lowercase())
            .ok_or_else(|| DomainError::UnknownProvider(config.provider.clone()))?;
        factory(config)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}
