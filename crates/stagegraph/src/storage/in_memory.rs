//! In-memory repository backed by a [`StageGraph`].
//!
//! All data lives in RAM and is lost when the process exits unless the
//! repository is wrapped by the JSONL backend. The graph and the ID generator
//! sit behind one `tokio::sync::Mutex`, so each call observes and mutates a
//! consistent state.

use super::StageRepository;
use crate::domain::{ItemId, NewStage, Stage, StageId, StageStatus, StageUpdate};
use crate::error::{Error, Result};
use crate::graph::{StageGraph, StatusChange};
use crate::id_generation::IdGenerator;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Inner storage structure (not thread-safe on its own).
pub(crate) struct InMemoryStorageInner {
    pub(crate) graph: StageGraph,
    pub(crate) ids: IdGenerator,
}

impl InMemoryStorageInner {
    /// Wrap an existing graph, registering its IDs with the generator.
    pub(crate) fn with_graph(prefix: String, graph: StageGraph) -> Self {
        let mut ids = IdGenerator::new(prefix);
        for stage in graph.stages() {
            ids.register_id(stage.id.as_str());
        }
        Self { graph, ids }
    }
}

/// Thread-safe in-memory storage.
pub(crate) type InMemoryStorage = Arc<Mutex<InMemoryStorageInner>>;

/// Create an empty in-memory repository.
///
/// # Arguments
///
/// * `prefix` - The prefix for generated stage IDs (e.g., "stg")
pub fn new_in_memory_storage(prefix: String) -> Box<dyn StageRepository> {
    from_graph(prefix, StageGraph::new())
}

/// Create an in-memory repository around an existing graph.
pub fn from_graph(prefix: String, graph: StageGraph) -> Box<dyn StageRepository> {
    Box::new(Arc::new(Mutex::new(InMemoryStorageInner::with_graph(
        prefix, graph,
    ))))
}

#[async_trait]
impl StageRepository for InMemoryStorage {
    async fn create(&mut self, new_stage: NewStage) -> Result<Stage> {
        let mut inner = self.lock().await;

        // === Phase 1: validations (no mutations) ===
        for dep in &new_stage.depends_on {
            if !inner.graph.contains(dep) {
                return Err(Error::StageNotFound(dep.clone()));
            }
        }

        // === Phase 2: ID generation ===
        let id = inner
            .ids
            .generate(new_stage.item_id.as_str(), &new_stage.name)
            .map_err(|e| Error::Storage(format!("ID generation failed: {}", e)))?;
        let id = StageId::new(id);

        // === Phase 3: insert, then attach edges with rollback ===
        let depends_on: BTreeSet<StageId> = new_stage.depends_on.iter().cloned().collect();
        let stage = new_stage.into_stage(id.clone());
        inner.graph.insert_stage(stage)?;

        for dep in &depends_on {
            if let Err(e) = inner.graph.add_dependency(&id, dep) {
                inner.graph.delete_stage(&id)?;
                return Err(e);
            }
        }

        inner.graph.require_stage(&id).cloned()
    }

    async fn insert(&mut self, stage: Stage) -> Result<()> {
        let mut inner = self.lock().await;
        let id = stage.id.clone();
        inner.graph.insert_stage(stage)?;
        inner.ids.register_id(id.as_str());
        Ok(())
    }

    async fn get(&self, id: &StageId) -> Result<Option<Stage>> {
        let inner = self.lock().await;
        Ok(inner.graph.stage(id).cloned())
    }

    async fn list(&self, item_id: Option<&ItemId>) -> Result<Vec<Stage>> {
        let inner = self.lock().await;
        let items: Vec<ItemId> = match item_id {
            Some(item) => vec![item.clone()],
            None => inner.graph.items().into_iter().collect(),
        };
        Ok(items
            .iter()
            .flat_map(|item| inner.graph.stages_for_item(item))
            .cloned()
            .collect())
    }

    async fn update(&mut self, id: &StageId, updates: StageUpdate) -> Result<Stage> {
        let mut inner = self.lock().await;
        inner.graph.update_stage(id, updates).cloned()
    }

    async fn set_status(&mut self, id: &StageId, status: StageStatus) -> Result<StatusChange> {
        let mut inner = self.lock().await;
        inner.graph.set_status(id, status)
    }

    async fn delete(&mut self, id: &StageId) -> Result<Stage> {
        let mut inner = self.lock().await;
        inner.graph.delete_stage(id)
    }

    async fn add_dependency(&mut self, from: &StageId, to: &StageId) -> Result<()> {
        let mut inner = self.lock().await;
        inner.graph.add_dependency(from, to)
    }

    async fn remove_dependency(&mut self, from: &StageId, to: &StageId) -> Result<()> {
        let mut inner = self.lock().await;
        inner.graph.remove_dependency(from, to)
    }

    async fn dependencies_of(&self, id: &StageId) -> Result<BTreeSet<StageId>> {
        let inner = self.lock().await;
        inner.graph.dependencies_of(id)
    }

    async fn dependents_of(&self, id: &StageId) -> Result<BTreeSet<StageId>> {
        let inner = self.lock().await;
        inner.graph.dependents_of(id)
    }

    async fn snapshot(&self) -> Result<StageGraph> {
        let inner = self.lock().await;
        Ok(inner.graph.clone())
    }

    async fn save(&self) -> Result<()> {
        // Nothing to persist without a backing file.
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_with_unknown_dependency_stores_nothing() {
        let mut storage = new_in_memory_storage("stg".to_string());
        let mut new_stage = NewStage::new("item-1", "Design");
        new_stage.depends_on = vec![StageId::new("stg-missing")];

        let err = storage.create(new_stage).await.unwrap_err();
        assert!(matches!(err, Error::StageNotFound(_)));
        assert!(storage.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_repeated_dependency_attaches_one_edge() {
        let mut storage = new_in_memory_storage("stg".to_string());
        let measure = storage
            .create(NewStage::new("item-1", "Measurement"))
            .await
            .unwrap();
        let mut design = NewStage::new("item-1", "Design");
        design.depends_on = vec![measure.id.clone(), measure.id.clone()];

        let design = storage.create(design).await.unwrap();
        let deps = storage.dependencies_of(&design.id).await.unwrap();
        assert_eq!(deps.into_iter().collect::<Vec<_>>(), vec![measure.id]);
    }

    #[tokio::test]
    async fn test_insert_registers_id() {
        let mut storage = new_in_memory_storage("stg".to_string());
        storage
            .insert(Stage::new("stg-abcd", "item-1", "Measurement"))
            .await
            .unwrap();
        let err = storage
            .insert(Stage::new("stg-abcd", "item-1", "Again"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }
}
