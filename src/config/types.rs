//! Configuration types.

use crate::ai::TASK_DECOMPOSITION_PROMPT;
use crate::format::OutputFormat;
use crate::storage::DEFAULT_PUBLIC_PREFIX;
use crate::tree::OrphanPolicy;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Task database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tasknest/tasknest.db")
}

/// Image storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding stored objects.
    #[serde(default = "default_storage_dir")]
    pub root_dir: PathBuf,

    /// Prefix applied to every image object name (default: `public/`).
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_storage_dir(),
            public_prefix: default_public_prefix(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("tasknest/storage")
}

fn default_public_prefix() -> String {
    DEFAULT_PUBLIC_PREFIX.to_string()
}

/// Forest rendering settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeConfig {
    /// What to do with todos whose parent is missing (`drop` or `promote`).
    #[serde(default)]
    pub orphan_policy: OrphanPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Identity to act as. Unset means signed out.
    #[serde(default)]
    pub user: Option<String>,
}

/// Task generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    /// Overrides the built-in task decomposition prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl AiConfig {
    pub fn system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(TASK_DECOMPOSITION_PROMPT)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a single YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}
