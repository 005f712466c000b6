//! Repository initialization.
//!
//! `stagegraph init` creates the `.stagegraph/` directory with a default
//! `config.yaml`, an empty `stages.jsonl` and a `.gitignore`.

use crate::config::{
    validate_prefix, StagegraphConfig, CONFIG_FILE_NAME, DEFAULT_PREFIX, STAGEGRAPH_DIR_NAME,
    STAGES_FILE_NAME,
};
use crate::error::{ConfigError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Paths created by a successful [`init`].
#[derive(Debug, Clone, Serialize)]
pub struct InitResult {
    /// The `.stagegraph/` directory
    pub stagegraph_dir: PathBuf,
    /// The configuration file
    pub config_file: PathBuf,
    /// The (empty) stage data file
    pub stages_file: PathBuf,
    /// The `.gitignore` inside `.stagegraph/`
    pub gitignore_file: PathBuf,
    /// The prefix written to the configuration
    pub prefix: String,
}

/// Initialize a stagegraph repository in `base_dir`.
///
/// # Errors
///
/// - `ConfigError::Invalid` if the prefix is malformed
/// - `ConfigError::AlreadyInitialized` if `.stagegraph/` already exists
pub async fn init(base_dir: &Path, prefix: Option<&str>) -> Result<InitResult> {
    let prefix = prefix.unwrap_or(DEFAULT_PREFIX).trim();
    validate_prefix(prefix)?;

    let stagegraph_dir = base_dir.join(STAGEGRAPH_DIR_NAME);
    if stagegraph_dir.exists() {
        return Err(ConfigError::AlreadyInitialized(base_dir.display().to_string()).into());
    }

    fs::create_dir_all(&stagegraph_dir).await?;

    let config_file = stagegraph_dir.join(CONFIG_FILE_NAME);
    StagegraphConfig::new(prefix).save(&config_file).await?;

    let stages_file = stagegraph_dir.join(STAGES_FILE_NAME);
    fs::write(&stages_file, "").await?;

    let gitignore_file = stagegraph_dir.join(GITIGNORE_FILE_NAME);
    fs::write(
        &gitignore_file,
        "# Temp files from interrupted saves\n*.tmp\n",
    )
    .await?;

    tracing::info!(dir = %stagegraph_dir.display(), prefix, "Initialized stagegraph repository");

    Ok(InitResult {
        stagegraph_dir,
        config_file,
        stages_file,
        gitignore_file,
        prefix: prefix.to_string(),
    })
}

/// Returns `true` if `.stagegraph/` exists directly in `base_dir`.
pub fn is_initialized(base_dir: &Path) -> bool {
    base_dir.join(STAGEGRAPH_DIR_NAME).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rstest::rstest;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_files() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path(), None).await.unwrap();

        assert_eq!(result.prefix, DEFAULT_PREFIX);
        assert!(result.stagegraph_dir.is_dir());
        assert!(result.config_file.is_file());
        assert!(result.stages_file.is_file());
        assert!(result.gitignore_file.is_file());
        assert!(is_initialized(temp_dir.path()));

        let stages = std::fs::read_to_string(&result.stages_file).unwrap();
        assert!(stages.is_empty());
    }

    #[tokio::test]
    async fn test_init_trims_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let result = init(temp_dir.path(), Some("  shop  ")).await.unwrap();
        assert_eq!(result.prefix, "shop");

        let config = StagegraphConfig::load(&result.config_file).await.unwrap();
        assert_eq!(config.stage_prefix, "shop");
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path(), None).await.unwrap();

        let err = init(temp_dir.path(), None).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::AlreadyInitialized(_))
        ));
    }

    #[rstest]
    #[case::too_short("x")]
    #[case::symbols("st*g")]
    #[tokio::test]
    async fn test_init_rejects_bad_prefix(#[case] prefix: &str) {
        let temp_dir = TempDir::new().unwrap();
        assert!(init(temp_dir.path(), Some(prefix)).await.is_err());
        assert!(!is_initialized(temp_dir.path()));
    }
}
