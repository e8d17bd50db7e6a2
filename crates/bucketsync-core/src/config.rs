//! Configuration module for bucketsync.
//!
//! A configuration file describes one bucket (top-level `provider` key) or
//! several named buckets keyed by name, with an optional `default` entry.
//! Files ending in `.json` are parsed as JSON; every other name, including
//! the extension-less `.bucketsync`, is parsed as YAML.
//!
//! ## Design Notes
//!
//! Keys the engine does not recognise are kept in `provider_settings` so
//! each backend can read its own options (`cdn_url`, `endpoint`, ...)
//! without the core knowing about them. Inline `credentials` are accepted
//! on load but never written back on save; secrets belong in the keyring.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::ChecksumAlgorithm;

/// File name looked up in the sync directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = ".bucketsync";

/// Upper bound accepted for `max_workers`.
pub const MAX_WORKERS_LIMIT: usize = 64;

const DEFAULT_MAX_WORKERS: usize = 4;
const DEFAULT_CONFLICT_RESOLUTION: &str = "local_wins";
const DEFAULT_CONFIG_NAME: &str = "default";

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_checksum_algorithm() -> String {
    ChecksumAlgorithm::default().as_str().to_string()
}

fn default_conflict_resolution() -> String {
    DEFAULT_CONFLICT_RESOLUTION.to_string()
}

// ---------------------------------------------------------------------------
// File format detection
// ---------------------------------------------------------------------------

/// On-disk serialization of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension; anything but `.json` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

fn read_document(path: &Path) -> anyhow::Result<serde_yaml::Value> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let document: serde_yaml::Value = match ConfigFormat::from_path(path) {
        ConfigFormat::Json => serde_json::from_str(&content)
            .with_context(|| format!("parsing JSON config {}", path.display()))?,
        ConfigFormat::Yaml => serde_yaml::from_str(&content)
            .with_context(|| format!("parsing YAML config {}", path.display()))?,
    };
    if !document.is_mapping() {
        anyhow::bail!(
            "Config file {} must contain a mapping at the top level",
            path.display()
        );
    }
    Ok(document)
}

fn write_document<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
    }
    let content = match ConfigFormat::from_path(path) {
        ConfigFormat::Json => serde_json::to_string_pretty(value)?,
        ConfigFormat::Yaml => serde_yaml::to_string(value)?,
    };
    std::fs::write(path, content)
        .with_context(|| format!("writing config file {}", path.display()))?;
    Ok(())
}

/// A single-bucket document has a top-level `provider` key.
fn is_single_bucket(document: &serde_yaml::Value) -> bool {
    document.get("provider").is_some()
}

// ---------------------------------------------------------------------------
// BucketConfig
// ---------------------------------------------------------------------------

/// Configuration of one bucket and how to sync it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Backend name as registered in the provider registry (`bunny`, `b2`, ...).
    pub provider: String,
    pub bucket_name: String,
    /// Resolved credential material, keyed by provider-specific names.
    #[serde(default, skip_serializing)]
    pub credentials: BTreeMap<String, String>,
    /// Keyring/environment context used to look up credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_context: Option<String>,
    /// Sub-paths a sync is restricted to; empty means the whole tree.
    #[serde(rename = "paths", default, skip_serializing_if = "Vec::is_empty")]
    pub sync_paths: Vec<String>,
    #[serde(default)]
    pub delete_orphaned: bool,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_checksum_algorithm")]
    pub checksum_algorithm: String,
    /// Advisory; the diff engine always lets local content win.
    #[serde(default = "default_conflict_resolution")]
    pub conflict_resolution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Every other key in the file.
    #[serde(flatten)]
    pub provider_settings: BTreeMap<String, serde_yaml::Value>,
}

impl BucketConfig {
    /// A configuration with default settings for `provider` and `bucket_name`.
    pub fn new(provider: impl Into<String>, bucket_name: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            bucket_name: bucket_name.into(),
            credentials: BTreeMap::new(),
            token_context: None,
            sync_paths: Vec::new(),
            delete_orphaned: false,
            max_workers: DEFAULT_MAX_WORKERS,
            checksum_algorithm: default_checksum_algorithm(),
            conflict_resolution: default_conflict_resolution(),
            region: None,
            provider_settings: BTreeMap::new(),
        }
    }

    /// Load a bucket configuration from `path`.
    ///
    /// For a multi-bucket file the `default` entry is used, falling back to
    /// the first entry in file order.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let document = read_document(path)?;
        if is_single_bucket(&document) {
            return Self::from_value(document)
                .with_context(|| format!("invalid bucket config in {}", path.display()));
        }

        let mapping = document
            .as_mapping()
            .context("configuration must be a mapping")?;
        let (name, value) = match mapping.get(DEFAULT_CONFIG_NAME) {
            Some(value) => (DEFAULT_CONFIG_NAME.to_string(), value.clone()),
            None => {
                let (key, value) = mapping
                    .iter()
                    .next()
                    .with_context(|| format!("no bucket configurations in {}", path.display()))?;
                let name = key.as_str().unwrap_or_default().to_string();
                warn!(
                    entry = %name,
                    path = %path.display(),
                    "No 'default' bucket configured, using first entry"
                );
                (name, value.clone())
            }
        };

        let mut config = Self::from_value(value)
            .with_context(|| format!("invalid bucket config '{}' in {}", name, path.display()))?;
        if config.token_context.is_none() && !name.is_empty() {
            config.token_context = Some(name);
        }
        Ok(config)
    }

    fn from_value(value: serde_yaml::Value) -> anyhow::Result<Self> {
        let config: BucketConfig = serde_yaml::from_value(value)?;
        if config.provider.trim().is_empty() {
            anyhow::bail!("'provider' must not be empty");
        }
        if config.bucket_name.trim().is_empty() {
            anyhow::bail!("'bucket_name' must not be empty");
        }
        Ok(config)
    }

    /// Write this configuration to `path` in the format its extension implies.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        write_document(path, self)
    }

    /// Parsed checksum algorithm, or `None` when the configured name is unknown.
    pub fn checksum(&self) -> Option<ChecksumAlgorithm> {
        ChecksumAlgorithm::parse(&self.checksum_algorithm)
    }

    /// Look up a credential, falling back to a string provider setting of
    /// the same name.
    pub fn credential(&self, key: &str) -> Option<String> {
        self.credentials
            .get(key)
            .filter(|value| !value.is_empty())
            .cloned()
            .or_else(|| self.provider_setting(key).map(str::to_string))
    }

    /// First credential present among `keys`.
    pub fn credential_any(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.credential(key))
    }

    /// A string-valued provider setting.
    pub fn provider_setting(&self, key: &str) -> Option<&str> {
        self.provider_settings
            .get(key)
            .and_then(|value| value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Context used for credential lookup: `token_context`, else the provider name.
    pub fn effective_token_context(&self) -> &str {
        self.token_context
            .as_deref()
            .filter(|ctx| !ctx.is_empty())
            .unwrap_or(&self.provider)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Name of the offending field, e.g. `"max_workers"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl BucketConfig {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. An unknown
    /// checksum algorithm is not an error; the scanner falls back to sha256.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.provider.trim().is_empty() {
            errors.push(ValidationError {
                field: "provider".into(),
                message: "must not be empty".into(),
            });
        }
        if self.bucket_name.trim().is_empty() {
            errors.push(ValidationError {
                field: "bucket_name".into(),
                message: "must not be empty".into(),
            });
        }

        if self.max_workers == 0 {
            errors.push(ValidationError {
                field: "max_workers".into(),
                message: "must be greater than 0".into(),
            });
        } else if self.max_workers > MAX_WORKERS_LIMIT {
            errors.push(ValidationError {
                field: "max_workers".into(),
                message: format!("must be at most {MAX_WORKERS_LIMIT}"),
            });
        }

        for (i, path) in self.sync_paths.iter().enumerate() {
            if path.trim().is_empty() {
                errors.push(ValidationError {
                    field: format!("paths[{i}]"),
                    message: "must not be empty".into(),
                });
            } else if path.replace('\\', "/").split('/').any(|seg| seg == "..") {
                errors.push(ValidationError {
                    field: format!("paths[{i}]"),
                    message: format!("must stay inside the sync directory: {path}"),
                });
            }
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// BucketConfigSet
// ---------------------------------------------------------------------------

/// A file of named bucket configurations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketConfigSet {
    configs: Vec<(String, BucketConfig)>,
}

impl BucketConfigSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every valid entry from `path`.
    ///
    /// Invalid entries are skipped with a warning; a file with no valid
    /// entry is an error. A single-bucket file loads as one entry named
    /// `default`.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let document = read_document(path)?;
        let entries: Vec<(String, serde_yaml::Value)> = if is_single_bucket(&document) {
            vec![(DEFAULT_CONFIG_NAME.to_string(), document)]
        } else {
            document
                .as_mapping()
                .map(|mapping| {
                    mapping
                        .iter()
                        .map(|(k, v)| (k.as_str().unwrap_or_default().to_string(), v.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut set = Self::new();
        for (name, value) in entries {
            match BucketConfig::from_value(value) {
                Ok(mut config) => {
                    if config.token_context.is_none() {
                        config.token_context = Some(name.clone());
                    }
                    set.insert(name, config);
                }
                Err(e) => {
                    warn!(entry = %name, error = %e, "Skipping invalid bucket configuration");
                }
            }
        }

        if set.is_empty() {
            anyhow::bail!("No valid bucket configurations found in {}", path.display());
        }
        Ok(set)
    }

    /// Write all entries to `path`, keyed by name.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let mut mapping = serde_yaml::Mapping::new();
        for (name, config) in &self.configs {
            mapping.insert(
                serde_yaml::Value::String(name.clone()),
                serde_yaml::to_value(config)?,
            );
        }
        write_document(path, &mapping)
    }

    /// Platform-appropriate default path for the user-level bucket file.
    ///
    /// Typically `$XDG_CONFIG_HOME/bucketsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("bucketsync")
            .join("config.yaml")
    }

    pub fn get(&self, name: &str) -> Option<&BucketConfig> {
        self.configs
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, config)| config)
    }

    /// Insert or replace the entry called `name`.
    pub fn insert(&mut self, name: impl Into<String>, config: BucketConfig) {
        let name = name.into();
        match self.configs.iter_mut().find(|(entry, _)| *entry == name) {
            Some((_, existing)) => *existing = config,
            None => self.configs.push((name, config)),
        }
    }

    /// Entry names in file order.
    pub fn names(&self) -> Vec<&str> {
        self.configs.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// The `default` entry, else the first one.
    pub fn default_config(&self) -> Option<&BucketConfig> {
        self.get(DEFAULT_CONFIG_NAME)
            .or_else(|| self.configs.first().map(|(_, config)| config))
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Fluent builder for [`BucketConfig`], starting from defaults.
#[derive(Debug, Clone)]
pub struct BucketConfigBuilder {
    config: BucketConfig,
}

impl BucketConfigBuilder {
    pub fn new(provider: impl Into<String>, bucket_name: impl Into<String>) -> Self {
        Self {
            config: BucketConfig::new(provider, bucket_name),
        }
    }

    pub fn credential(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.credentials.insert(key.into(), value.into());
        self
    }

    pub fn token_context(mut self, context: impl Into<String>) -> Self {
        self.config.token_context = Some(context.into());
        self
    }

    pub fn sync_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sync_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn delete_orphaned(mut self, delete: bool) -> Self {
        self.config.delete_orphaned = delete;
        self
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.config.max_workers = workers;
        self
    }

    pub fn checksum_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.config.checksum_algorithm = algorithm.into();
        self
    }

    pub fn conflict_resolution(mut self, policy: impl Into<String>) -> Self {
        self.config.conflict_resolution = policy.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    pub fn provider_setting(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_yaml::Value>,
    ) -> Self {
        self.config.provider_settings.insert(key.into(), value.into());
        self
    }

    /// Consume the builder and return the finished [`BucketConfig`].
    pub fn build(self) -> BucketConfig {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<BucketConfig, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}
