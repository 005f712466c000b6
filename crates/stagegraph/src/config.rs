//! Repository configuration.
//!
//! A stagegraph repository is a `.stagegraph/` directory holding
//! `config.yaml` and the JSONL data file. The directory is found by walking up
//! from the working directory.

use crate::analysis::Palette;
use crate::error::{ConfigError, Result};
use crate::storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Default stage ID prefix if none specified
pub const DEFAULT_PREFIX: &str = "stg";

/// Name of the repository directory
pub const STAGEGRAPH_DIR_NAME: &str = ".stagegraph";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the stages data file
pub const STAGES_FILE_NAME: &str = "stages.jsonl";

/// Minimum prefix length
pub const MIN_PREFIX_LENGTH: usize = 2;

/// Maximum prefix length
pub const MAX_PREFIX_LENGTH: usize = 20;

/// Maximum directory depth to traverse when searching for the repository root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StagegraphConfig {
    /// Stage ID prefix (e.g., "stg" for "stg-a3f8")
    #[serde(rename = "stage-prefix")]
    pub stage_prefix: String,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Chain colors; empty means the built-in palette
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub palette: Vec<String>,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Storage backend type ("memory" for in-memory with JSONL persistence)
    pub backend: String,

    /// Path to the data file, relative to the repository root
    pub data_file: String,
}

impl StorageConfig {
    /// Resolve the configured backend against the repository root.
    pub fn to_backend(&self, root_dir: &Path) -> Result<StorageBackend> {
        match self.backend.as_str() {
            "memory" | "jsonl" => Ok(StorageBackend::Jsonl(root_dir.join(&self.data_file))),
            other => Err(ConfigError::Invalid(format!(
                "Unknown storage backend '{}'. Supported: memory",
                other
            ))
            .into()),
        }
    }
}

impl StagegraphConfig {
    /// Create a new configuration with the given prefix
    pub fn new(prefix: &str) -> Self {
        Self {
            stage_prefix: prefix.to_string(),
            storage: StorageConfig {
                backend: "memory".to_string(),
                data_file: format!("{}/{}", STAGEGRAPH_DIR_NAME, STAGES_FILE_NAME),
            },
            palette: Vec::new(),
        }
    }

    /// Load configuration from a file and validate it
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Invalid(format!("YAML error: {}", e)))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Check the prefix and palette entries.
    pub fn validate(&self) -> Result<()> {
        validate_prefix(&self.stage_prefix)?;
        for color in &self.palette {
            validate_color(color)?;
        }
        Ok(())
    }

    /// Palette to color chains with.
    pub fn palette(&self) -> Palette {
        Palette::new(self.palette.clone())
    }
}

impl Default for StagegraphConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

/// Validate stage ID prefix format.
///
/// Requirements: 2-20 ASCII alphanumeric characters. Expects trimmed input.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.len() < MIN_PREFIX_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "Prefix must be at least {} characters",
            MIN_PREFIX_LENGTH
        ))
        .into());
    }

    if prefix.len() > MAX_PREFIX_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "Prefix cannot exceed {} characters",
            MAX_PREFIX_LENGTH
        ))
        .into());
    }

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::Invalid(
            "Prefix must contain only alphanumeric characters".to_string(),
        )
        .into());
    }

    Ok(())
}

/// Validate a `#rrggbb` palette color.
pub fn validate_color(color: &str) -> Result<()> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "Palette color '{}' must have the form #rrggbb",
            color
        ))
        .into())
    }
}

/// Parse a validated `#rrggbb` color into RGB components.
pub fn parse_color(color: &str) -> Option<(u8, u8, u8)> {
    validate_color(color).ok()?;
    let channel = |range| u8::from_str_radix(&color[range], 16).ok();
    Some((channel(1..3)?, channel(3..5)?, channel(5..7)?))
}

/// Find the repository root by searching up the directory tree.
///
/// Returns the directory containing `.stagegraph/`, or `None` if none is
/// found within [`MAX_TRAVERSAL_DEPTH`] levels.
pub fn find_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(STAGEGRAPH_DIR_NAME).exists() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
