//! Application context for CLI command execution.
//!
//! # Example
//!
//! ```no_run
//! use stagegraph::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     let graph = app.storage().snapshot().await?;
//!     println!("{} stages", graph.len());
//!     Ok(())
//! }
//! ```

use crate::analysis::Palette;
use crate::config::{find_root, StagegraphConfig, CONFIG_FILE_NAME, STAGEGRAPH_DIR_NAME};
use crate::error::{ConfigError, Result};
use crate::storage::{create_storage, StageRepository};
use std::path::{Path, PathBuf};

/// Application context for CLI operations.
///
/// Storage is loaded from the repository's data file on creation and written
/// back by [`App::save`].
pub struct App {
    storage: Box<dyn StageRepository>,
    stagegraph_dir: PathBuf,
    prefix: String,
    palette: Palette,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("stagegraph_dir", &self.stagegraph_dir)
            .field("prefix", &self.prefix)
            .field("palette", &self.palette)
            .field("storage", &"<dyn StageRepository>")
            .finish()
    }
}

impl App {
    /// Create an App from the given working directory.
    ///
    /// Searches up the directory tree for `.stagegraph/`, loads the
    /// configuration and opens the configured storage.
    ///
    /// # Errors
    ///
    /// - `ConfigError::NotInitialized` if no repository is found
    /// - `ConfigError::Invalid` if the configuration cannot be loaded
    /// - I/O errors from opening the data file
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root_dir = find_root(working_dir).ok_or(ConfigError::NotInitialized)?;

        let stagegraph_dir = root_dir.join(STAGEGRAPH_DIR_NAME);
        let config = StagegraphConfig::load(&stagegraph_dir.join(CONFIG_FILE_NAME)).await?;

        let backend = config.storage.to_backend(&root_dir)?;
        let storage = create_storage(backend, config.stage_prefix.clone()).await?;

        Ok(Self {
            storage,
            stagegraph_dir,
            palette: config.palette(),
            prefix: config.stage_prefix,
        })
    }

    /// Get a mutable reference to the storage.
    pub fn storage_mut(&mut self) -> &mut dyn StageRepository {
        self.storage.as_mut()
    }

    /// Get an immutable reference to the storage.
    pub fn storage(&self) -> &dyn StageRepository {
        self.storage.as_ref()
    }

    /// Get the stage ID prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Chain palette from the configuration.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Get the path to the `.stagegraph/` directory.
    pub fn stagegraph_dir(&self) -> &Path {
        &self.stagegraph_dir
    }

    /// Save storage state; call after any mutating operation.
    pub async fn save(&self) -> Result<()> {
        self.storage.save().await
    }
}
