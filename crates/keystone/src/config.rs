//! Engine configuration.
//!
//! Configuration lives in a YAML file, by default `.keystone/config.yaml`:
//!
//! ```yaml
//! max-scope-nodes: 10000
//! default-estimate-days: 1
//! storage:
//!   backend: jsonl
//!   data-file: .keystone/dependencies.jsonl
//! ```

use crate::error::{Error, Result};
use crate::storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Name of the keystone directory
pub const KEYSTONE_DIR_NAME: &str = ".keystone";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the dependency data file
pub const DEPENDENCIES_FILE_NAME: &str = "dependencies.jsonl";

/// Default upper bound on the number of work items in one calculation
pub const DEFAULT_MAX_SCOPE_NODES: usize = 10_000;

/// Estimate used for work items without one
pub const DEFAULT_ESTIMATE_DAYS: u64 = 1;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Calculations over larger scopes are rejected with `ScopeTooLarge`
    #[serde(default = "default_max_scope_nodes")]
    pub max_scope_nodes: usize,

    /// Duration assumed for work items without an estimate
    #[serde(default = "default_estimate_days")]
    pub default_estimate_days: u64,

    /// Dependency storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Storage backend type: "memory" or "jsonl"
    pub backend: String,

    /// Path to the data file, relative to the project root
    pub data_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            data_file: format!("{KEYSTONE_DIR_NAME}/{DEPENDENCIES_FILE_NAME}"),
        }
    }
}

impl StorageConfig {
    /// Resolve the configured backend against the project root.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for unknown backend names.
    pub fn to_backend(&self, root_dir: &Path) -> Result<StorageBackend> {
        match self.backend.as_str() {
            "memory" => Ok(StorageBackend::InMemory),
            "jsonl" => Ok(StorageBackend::Jsonl(root_dir.join(&self.data_file))),
            other => Err(Error::Config(format!(
                "Unknown storage backend '{other}' (expected 'memory' or 'jsonl')"
            ))),
        }
    }
}

fn default_max_scope_nodes() -> usize {
    DEFAULT_MAX_SCOPE_NODES
}

fn default_estimate_days() -> u64 {
    DEFAULT_ESTIMATE_DAYS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_scope_nodes: DEFAULT_MAX_SCOPE_NODES,
            default_estimate_days: DEFAULT_ESTIMATE_DAYS,
            storage: StorageConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `max-scope-nodes` is zero or the storage
    /// backend is unknown.
    pub fn validate(&self) -> Result<()> {
        if self.max_scope_nodes == 0 {
            return Err(Error::Config(
                "max-scope-nodes must be at least 1".to_string(),
            ));
        }
        self.storage.to_backend(Path::new("."))?;
        Ok(())
    }

    /// Load and validate configuration from a file
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and `Error::Config` if
    /// it cannot be parsed or fails validation.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` on write failures.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);

        let config = EngineConfig {
            max_scope_nodes: 250,
            default_estimate_days: 2,
            storage: StorageConfig {
                backend: "jsonl".to_string(),
                data_file: "deps.jsonl".to_string(),
            },
        };
        config.save(&path).await.unwrap();

        let loaded = EngineConfig::load(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_missing_keys_fall_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "max-scope-nodes: 42\n").await.unwrap();

        let loaded = EngineConfig::load(&path).await.unwrap();
        assert_eq!(loaded.max_scope_nodes, 42);
        assert_eq!(loaded.default_estimate_days, DEFAULT_ESTIMATE_DAYS);
        assert_eq!(loaded.storage, StorageConfig::default());
    }

    #[tokio::test]
    async fn test_zero_scope_limit_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "max-scope-nodes: 0\n").await.unwrap();

        let err = EngineConfig::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("max-scope-nodes"));
    }

    #[rstest]
    #[case::memory("memory", true)]
    #[case::jsonl("jsonl", true)]
    #[case::postgres("postgres", false)]
    fn test_backend_resolution(#[case] backend: &str, #[case] ok: bool) {
        let storage = StorageConfig {
            backend: backend.to_string(),
            ..StorageConfig::default()
        };
        assert_eq!(storage.to_backend(Path::new("/proj")).is_ok(), ok);
    }

    #[test]
    fn test_jsonl_path_is_rooted() {
        let storage = StorageConfig {
            backend: "jsonl".to_string(),
            ..StorageConfig::default()
        };
        let backend = storage.to_backend(Path::new("/proj")).unwrap();
        assert_eq!(
            backend.data_path().unwrap(),
            Path::new("/proj/.keystone/dependencies.jsonl")
        );
    }
}
