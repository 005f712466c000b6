//! Repository layer for stage graphs.
//!
//! The engine itself is a plain value ([`StageGraph`]); this module wraps it
//! for callers that share one graph across async tasks and want it persisted.
//!
//! - **In-memory**: ephemeral, backed by `Arc<Mutex<StageGraph>>`
//! - **JSONL**: in-memory plus a JSON Lines file written on `save()`
//!
//! Every mutating method funnels through the graph's own operations, so the
//! cycle guard and the transition gate run before anything is committed.
//!
//! # Example
//!
//! ```no_run
//! use stagegraph::domain::NewStage;
//! use stagegraph::storage::{create_storage, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let mut storage = create_storage(StorageBackend::InMemory, "stg".to_string()).await?;
//!
//!     let measure = storage.create(NewStage::new("kitchen-1", "Measurement")).await?;
//!     let mut design = NewStage::new("kitchen-1", "Design");
//!     design.depends_on = vec![measure.id.clone()];
//!     let design = storage.create(design).await?;
//!
//!     println!("{} waits on {}", design.id, measure.id);
//!     Ok(())
//! }
//! ```

pub mod in_memory;
pub mod jsonl;

use crate::domain::{ItemId, NewStage, Stage, StageId, StageStatus, StageUpdate};
use crate::error::Result;
use crate::graph::{StageGraph, StatusChange};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub use crate::graph::LoadWarning;

/// Storage interface for stages and their dependencies.
///
/// Implementations must be `Send + Sync` so a repository can be shared
/// across tasks.
///
/// # Method Categories
///
/// - **Stages**: `create`, `insert`, `get`, `list`, `update`, `delete`
/// - **Status**: `set_status` (gated)
/// - **Dependencies**: `add_dependency`, `remove_dependency`, `dependencies_of`, `dependents_of`
/// - **Analysis**: `snapshot`
/// - **Persistence**: `save`, `reload`
#[async_trait]
pub trait StageRepository: Send + Sync {
    // ========== Stages ==========

    /// Create a stage with a generated ID and attach its prerequisites.
    ///
    /// Either the stage and all its edges are stored, or nothing is.
    ///
    /// # Errors
    ///
    /// - `Error::Storage` if validation fails
    /// - `Error::StageNotFound` if a prerequisite doesn't exist
    async fn create(&mut self, stage: NewStage) -> Result<Stage>;

    /// Store a stage that already has an ID (imports, fixtures).
    async fn insert(&mut self, stage: Stage) -> Result<()>;

    /// Get a stage by ID; `None` if it doesn't exist.
    async fn get(&self, id: &StageId) -> Result<Option<Stage>>;

    /// List stages, optionally restricted to one item, in item and display order.
    async fn list(&self, item_id: Option<&ItemId>) -> Result<Vec<Stage>>;

    /// Update free-form stage fields.
    async fn update(&mut self, id: &StageId, updates: StageUpdate) -> Result<Stage>;

    /// Change a stage's status, consulting the transition gate first.
    ///
    /// # Errors
    ///
    /// - `Error::BlockedTransition` if same-item prerequisites are unfinished
    async fn set_status(&mut self, id: &StageId, status: StageStatus) -> Result<StatusChange>;

    /// Delete a stage and every edge touching it.
    async fn delete(&mut self, id: &StageId) -> Result<Stage>;

    // ========== Dependencies ==========

    /// Record that `from` depends on `to`.
    ///
    /// # Errors
    ///
    /// - `Error::CircularDependency` / `Error::SelfDependency` if the edge would close a cycle
    async fn add_dependency(&mut self, from: &StageId, to: &StageId) -> Result<()>;

    /// Remove the edge `from -> to`.
    async fn remove_dependency(&mut self, from: &StageId, to: &StageId) -> Result<()>;

    /// Direct prerequisites of a stage.
    async fn dependencies_of(&self, id: &StageId) -> Result<BTreeSet<StageId>>;

    /// Stages directly waiting on this one.
    async fn dependents_of(&self, id: &StageId) -> Result<BTreeSet<StageId>>;

    // ========== Analysis ==========

    /// Copy of the current graph for read-only analyses.
    async fn snapshot(&self) -> Result<StageGraph>;

    // ========== Persistence ==========

    /// Write changes to persistent storage; no-op for in-memory storage.
    async fn save(&self) -> Result<()>;

    /// Discard in-memory changes and reload from persistent storage.
    ///
    /// Use after a failed `save()` to get back in sync with disk.
    async fn reload(&mut self) -> Result<()>;
}

/// Storage backend configuration.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// JSONL file storage (persistent)
    Jsonl(PathBuf),
}

impl StorageBackend {
    /// Returns the data file path for file-based backends.
    pub fn data_path(&self) -> Option<&Path> {
        match self {
            StorageBackend::Jsonl(path) => Some(path),
            StorageBackend::InMemory => None,
        }
    }
}

/// Wrapper that adds JSONL file persistence to any repository.
struct JsonlBackedStorage {
    inner: Box<dyn StageRepository>,
    path: PathBuf,
    prefix: String,
}

#[async_trait]
impl StageRepository for JsonlBackedStorage {
    async fn create(&mut self, stage: NewStage) -> Result<Stage> {
        self.inner.create(stage).await
    }

    async fn insert(&mut self, stage: Stage) -> Result<()> {
        self.inner.insert(stage).await
    }

    async fn get(&self, id: &StageId) -> Result<Option<Stage>> {
        self.inner.get(id).await
    }

    async fn list(&self, item_id: Option<&ItemId>) -> Result<Vec<Stage>> {
        self.inner.list(item_id).await
    }

    async fn update(&mut self, id: &StageId, updates: StageUpdate) -> Result<Stage> {
        self.inner.update(id, updates).await
    }

    async fn set_status(&mut self, id: &StageId, status: StageStatus) -> Result<StatusChange> {
        self.inner.set_status(id, status).await
    }

    async fn delete(&mut self, id: &StageId) -> Result<Stage> {
        self.inner.delete(id).await
    }

    async fn add_dependency(&mut self, from: &StageId, to: &StageId) -> Result<()> {
        self.inner.add_dependency(from, to).await
    }

    async fn remove_dependency(&mut self, from: &StageId, to: &StageId) -> Result<()> {
        self.inner.remove_dependency(from, to).await
    }

    async fn dependencies_of(&self, id: &StageId) -> Result<BTreeSet<StageId>> {
        self.inner.dependencies_of(id).await
    }

    async fn dependents_of(&self, id: &StageId) -> Result<BTreeSet<StageId>> {
        self.inner.dependents_of(id).await
    }

    async fn snapshot(&self) -> Result<StageGraph> {
        self.inner.snapshot().await
    }

    async fn save(&self) -> Result<()> {
        jsonl::save_to_jsonl(self.inner.as_ref(), &self.path).await
    }

    async fn reload(&mut self) -> Result<()> {
        self.inner = open_jsonl(&self.path, &self.prefix).await?;
        Ok(())
    }
}

/// Load the JSONL file if it exists, logging load warnings.
async fn open_jsonl(path: &Path, prefix: &str) -> Result<Box<dyn StageRepository>> {
    if !path.exists() {
        // First run: nothing written yet.
        return Ok(in_memory::new_in_memory_storage(prefix.to_string()));
    }
    let (storage, warnings) = jsonl::load_from_jsonl(path, prefix.to_string()).await?;
    for warning in &warnings {
        tracing::warn!(warning = ?warning, "JSONL load warning");
    }
    Ok(storage)
}

/// Create a repository for the given backend.
///
/// # Arguments
///
/// * `backend` - The storage backend to use
/// * `prefix` - The prefix for generated stage IDs
///
/// # Errors
///
/// - `Error::Io` / `Error::Json` if the JSONL file cannot be read
pub async fn create_storage(
    backend: StorageBackend,
    prefix: String,
) -> Result<Box<dyn StageRepository>> {
    match backend {
        StorageBackend::InMemory => Ok(in_memory::new_in_memory_storage(prefix)),
        StorageBackend::Jsonl(path) => {
            let inner = open_jsonl(&path, &prefix).await?;
            Ok(Box::new(JsonlBackedStorage {
                inner,
                path,
                prefix,
            }))
        }
    }
}
