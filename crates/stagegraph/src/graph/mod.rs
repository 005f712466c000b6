//! The stage dependency graph.
//!
//! [`StageGraph`] holds the authoritative stage and dependency collections for
//! a project. It is a plain value: analyses take `&StageGraph` and return
//! derived views, mutations take `&mut StageGraph` and either commit fully or
//! leave the graph untouched.
//!
//! # Edge Direction Convention
//!
//! Edges point from **dependent -> prerequisite**:
//!
//! - **Edge source**: the stage that waits
//! - **Edge target**: the stage that must finish first
//!
//! If "production" depends on "approval", the edge is `production -> approval`.
//! Outgoing edges of a node are therefore its prerequisites, incoming edges its
//! dependents.
//!
//! # Item Scoping
//!
//! Edges between stages of different items are stored and returned by
//! [`StageGraph::dependencies_of`] / [`StageGraph::dependents_of`], but they are
//! inert for cycle checks, gating, leveling and delay propagation. The
//! `same_item_*` helpers apply that restriction.
//!
//! # Representation
//!
//! - `HashMap<StageId, Stage>` for O(1) stage lookups
//! - `petgraph::stable_graph::StableDiGraph` so node indices survive deletions
//! - `HashMap<StageId, NodeIndex>` mapping stages to graph nodes

pub mod cycle;

use crate::domain::{Dependency, ItemId, Stage, StageId, StageRecord, StageStatus, StageUpdate};
use crate::error::{Error, Result};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// Non-fatal problems found while building a graph from stored records.
///
/// The offending record or edge is skipped and loading continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Line that couldn't be parsed as a stage record
    MalformedJson {
        /// 1-based line number
        line_number: usize,
        /// Parser message
        error: String,
    },

    /// Stage record failed validation; the stage is skipped
    InvalidStageData {
        /// ID of the rejected stage
        stage_id: StageId,
        /// Validation message
        error: String,
    },

    /// A second record with an already loaded ID; the later one is skipped
    DuplicateStage {
        /// The repeated ID
        stage_id: StageId,
    },

    /// Edge references a stage that doesn't exist; the edge is skipped
    OrphanedDependency {
        /// Dependent stage
        from: StageId,
        /// Missing prerequisite
        to: StageId,
    },

    /// Edge would close a cycle; the edge is skipped
    CircularDependency {
        /// Dependent stage
        from: StageId,
        /// Prerequisite stage
        to: StageId,
    },
}

/// Outcome of an accepted status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    /// Status before the change
    pub previous: StageStatus,
    /// Status after the change
    pub current: StageStatus,
}

/// In-memory stage graph for one project.
#[derive(Debug, Clone, Default)]
pub struct StageGraph {
    /// Stages indexed by ID
    stages: HashMap<StageId, Stage>,

    /// Dependency graph; nodes carry the stage ID, edges carry nothing.
    /// Edge direction: source (dependent) -> target (prerequisite).
    graph: StableDiGraph<StageId, ()>,

    /// Every stage in `stages` has exactly one entry here.
    node_map: HashMap<StageId, NodeIndex>,
}

impl StageGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from persisted records.
    ///
    /// Stages are inserted first, then edges, so records may reference stages
    /// that appear later. Invalid stages, duplicate IDs, orphaned edges and
    /// edges that would close a cycle are skipped with a warning.
    pub fn from_records(records: Vec<StageRecord>) -> (Self, Vec<LoadWarning>) {
        let mut graph = Self::new();
        let mut warnings = Vec::new();
        let mut edges = Vec::new();

        for record in records {
            let StageRecord { stage, depends_on } = record;
            if let Err(error) = stage.validate() {
                warnings.push(LoadWarning::InvalidStageData {
                    stage_id: stage.id.clone(),
                    error,
                });
                continue;
            }
            if graph.contains(&stage.id) {
                warnings.push(LoadWarning::DuplicateStage {
                    stage_id: stage.id.clone(),
                });
                continue;
            }
            let id = stage.id.clone();
            graph.insert_unchecked(stage);
            edges.extend(depends_on.into_iter().map(|to| (id.clone(), to)));
        }

        for (from, to) in edges {
            if !graph.contains(&to) {
                warnings.push(LoadWarning::OrphanedDependency { from, to });
                continue;
            }
            match graph.add_dependency(&from, &to) {
                Ok(()) | Err(Error::DuplicateDependency { .. }) => {}
                Err(Error::SelfDependency(_) | Error::CircularDependency { .. }) => {
                    warnings.push(LoadWarning::CircularDependency { from, to });
                }
                Err(other) => {
                    // Both endpoints were checked above; anything else is a logic bug.
                    warnings.push(LoadWarning::InvalidStageData {
                        stage_id: from,
                        error: other.to_string(),
                    });
                }
            }
        }

        (graph, warnings)
    }

    /// Export every stage with its outgoing edges.
    ///
    /// Records are sorted by item, order and ID, and each `depends_on` list is
    /// sorted, so repeated exports of the same graph are byte-identical.
    pub fn to_records(&self) -> Vec<StageRecord> {
        let mut records: Vec<StageRecord> = self
            .stages
            .values()
            .map(|stage| {
                let depends_on = self
                    .dependencies_of(&stage.id)
                    .map(|deps| deps.into_iter().collect())
                    .unwrap_or_default();
                StageRecord {
                    stage: stage.clone(),
                    depends_on,
                }
            })
            .collect();
        records.sort_by(|a, b| {
            a.stage
                .item_id
                .cmp(&b.stage.item_id)
                .then(a.stage.order.cmp(&b.stage.order))
                .then_with(|| a.stage.id.cmp(&b.stage.id))
        });
        records
    }

    // ========== Stages ==========

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the graph holds no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Number of stored edges, including cross-item ones.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether a stage with this ID exists.
    pub fn contains(&self, id: &StageId) -> bool {
        self.stages.contains_key(id)
    }

    /// Look up a stage.
    pub fn stage(&self, id: &StageId) -> Option<&Stage> {
        self.stages.get(id)
    }

    /// Look up a stage, failing with [`Error::StageNotFound`].
    pub fn require_stage(&self, id: &StageId) -> Result<&Stage> {
        self.stages
            .get(id)
            .ok_or_else(|| Error::StageNotFound(id.clone()))
    }

    /// Iterate over all stages in arbitrary order.
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.values()
    }

    /// Stages of one item, sorted by `order` then ID.
    pub fn stages_for_item(&self, item_id: &ItemId) -> Vec<&Stage> {
        let mut stages: Vec<&Stage> = self
            .stages
            .values()
            .filter(|stage| &stage.item_id == item_id)
            .collect();
        stages.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        stages
    }

    /// All item IDs that have at least one stage.
    pub fn items(&self) -> BTreeSet<ItemId> {
        self.stages.values().map(|s| s.item_id.clone()).collect()
    }

    /// Add a stage.
    ///
    /// # Errors
    ///
    /// - `Error::Storage` if the stage fails validation or the ID is taken
    pub fn insert_stage(&mut self, stage: Stage) -> Result<()> {
        stage
            .validate()
            .map_err(|e| Error::Storage(format!("Validation failed: {}", e)))?;
        if self.contains(&stage.id) {
            return Err(Error::Storage(format!(
                "Stage already exists: {}",
                stage.id
            )));
        }
        debug!(stage = %stage.id, item = %stage.item_id, "Inserting stage");
        self.insert_unchecked(stage);
        Ok(())
    }

    fn insert_unchecked(&mut self, stage: Stage) {
        let node = self.graph.add_node(stage.id.clone());
        self.node_map.insert(stage.id.clone(), node);
        self.stages.insert(stage.id.clone(), stage);
    }

    /// Apply free-form field updates to a stage.
    ///
    /// Status is not touched here; see [`StageGraph::set_status`].
    pub fn update_stage(&mut self, id: &StageId, updates: StageUpdate) -> Result<&Stage> {
        let current = self.require_stage(id)?;
        let mut updated = current.clone();

        if let Some(name) = updates.name {
            updated.name = name;
        }
        if let Some(order) = updates.order {
            updated.order = order;
        }
        if let Some(stage_type_id) = updates.stage_type_id {
            updated.stage_type_id = stage_type_id;
        }
        if let Some(start) = updates.planned_start_date {
            updated.planned_start_date = start;
        }
        if let Some(end) = updates.planned_end_date {
            updated.planned_end_date = end;
        }

        updated
            .validate()
            .map_err(|e| Error::Storage(format!("Validation failed: {}", e)))?;

        let slot = self
            .stages
            .get_mut(id)
            .ok_or_else(|| Error::StageNotFound(id.clone()))?;
        *slot = updated;
        Ok(&*slot)
    }

    /// Change a stage's status after consulting the transition gate.
    ///
    /// # Errors
    ///
    /// - `Error::StageNotFound` if the stage doesn't exist
    /// - `Error::BlockedTransition` if same-item prerequisites are unfinished
    pub fn set_status(&mut self, id: &StageId, status: StageStatus) -> Result<StatusChange> {
        crate::gate::check_transition(self, id, status)?;

        let stage = self
            .stages
            .get_mut(id)
            .ok_or_else(|| Error::StageNotFound(id.clone()))?;
        let previous = stage.status;
        stage.status = status;

        info!(stage = %id, from = %previous, to = %status, "Stage status changed");
        Ok(StatusChange {
            previous,
            current: status,
        })
    }

    /// Delete a stage together with every edge touching it.
    ///
    /// Returns the removed stage.
    pub fn delete_stage(&mut self, id: &StageId) -> Result<Stage> {
        let node = self.node(id)?;
        let touching = self.graph.edges_directed(node, Direction::Outgoing).count()
            + self.graph.edges_directed(node, Direction::Incoming).count();

        // StableGraph drops the node's edges along with it.
        self.graph.remove_node(node);
        self.node_map.remove(id);
        let stage = self
            .stages
            .remove(id)
            .ok_or_else(|| Error::Internal(format!("stage {} had a node but no record", id)))?;

        info!(stage = %id, removed_edges = touching, "Deleted stage");
        Ok(stage)
    }

    // ========== Dependencies ==========

    /// Record that `from` depends on `to`.
    ///
    /// The cycle guard runs before anything is committed; on error the graph
    /// is unchanged.
    ///
    /// # Errors
    ///
    /// - `Error::StageNotFound` if either stage doesn't exist
    /// - `Error::SelfDependency` if `from == to`
    /// - `Error::DuplicateDependency` if the edge already exists
    /// - `Error::CircularDependency` if the edge would close a same-item cycle
    pub fn add_dependency(&mut self, from: &StageId, to: &StageId) -> Result<()> {
        let from_node = self.node(from)?;
        let to_node = self.node(to)?;

        if from == to {
            return Err(Error::SelfDependency(from.clone()));
        }

        if self.graph.find_edge(from_node, to_node).is_some() {
            return Err(Error::DuplicateDependency {
                from: from.clone(),
                to: to.clone(),
            });
        }

        cycle::check_new_edge(self, from, to)?;

        self.graph.add_edge(from_node, to_node, ());
        debug!(from = %from, to = %to, "Added dependency");
        Ok(())
    }

    /// Remove the edge `from -> to`.
    ///
    /// # Errors
    ///
    /// - `Error::StageNotFound` if either stage doesn't exist
    /// - `Error::DependencyNotFound` if there is no such edge
    pub fn remove_dependency(&mut self, from: &StageId, to: &StageId) -> Result<()> {
        let from_node = self.node(from)?;
        let to_node = self.node(to)?;

        let edge = self
            .graph
            .find_edge(from_node, to_node)
            .ok_or_else(|| Error::DependencyNotFound {
                from: from.clone(),
                to: to.clone(),
            })?;
        self.graph.remove_edge(edge);
        debug!(from = %from, to = %to, "Removed dependency");
        Ok(())
    }

    /// Whether the edge `from -> to` exists.
    pub fn has_dependency(&self, from: &StageId, to: &StageId) -> bool {
        match (self.node_map.get(from), self.node_map.get(to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Direct prerequisites of a stage, across all items.
    pub fn dependencies_of(&self, id: &StageId) -> Result<BTreeSet<StageId>> {
        let node = self.node(id)?;
        Ok(self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect())
    }

    /// Stages that directly wait on this one, across all items.
    pub fn dependents_of(&self, id: &StageId) -> Result<BTreeSet<StageId>> {
        let node = self.node(id)?;
        Ok(self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect())
    }

    /// Every stored edge, sorted.
    pub fn dependencies(&self) -> Vec<Dependency> {
        let mut deps: Vec<Dependency> = self
            .graph
            .edge_references()
            .map(|edge| Dependency {
                stage_id: self.graph[edge.source()].clone(),
                depends_on_stage_id: self.graph[edge.target()].clone(),
            })
            .collect();
        deps.sort();
        deps
    }

    /// Direct prerequisites sharing the stage's item.
    pub fn same_item_prerequisites(&self, id: &StageId) -> Result<Vec<&Stage>> {
        self.same_item_neighbors(id, Direction::Outgoing)
    }

    /// Direct dependents sharing the stage's item.
    pub fn same_item_dependents(&self, id: &StageId) -> Result<Vec<&Stage>> {
        self.same_item_neighbors(id, Direction::Incoming)
    }

    fn same_item_neighbors(&self, id: &StageId, direction: Direction) -> Result<Vec<&Stage>> {
        let stage = self.require_stage(id)?;
        let node = self.node(id)?;

        let mut neighbors = Vec::new();
        for neighbor in self.graph.neighbors_directed(node, direction) {
            let neighbor_id = &self.graph[neighbor];
            let other = self.stages.get(neighbor_id).ok_or_else(|| {
                Error::Internal(format!(
                    "edge {} <-> {} points at a stage with no record",
                    id, neighbor_id
                ))
            })?;
            if other.item_id == stage.item_id {
                neighbors.push(other);
            }
        }
        neighbors.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(neighbors)
    }

    pub(crate) fn node(&self, id: &StageId) -> Result<NodeIndex> {
        self.node_map
            .get(id)
            .copied()
            .ok_or_else(|| Error::StageNotFound(id.clone()))
    }

    pub(crate) fn petgraph(&self) -> &StableDiGraph<StageId, ()> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(ids: &[(&str, &str)]) -> StageGraph {
        let mut graph = StageGraph::new();
        for (order, (id, item)) in ids.iter().enumerate() {
            let mut stage = Stage::new(*id, *item, format!("Stage {id}"));
            stage.order = order as i32;
            graph.insert_stage(stage).unwrap();
        }
        graph
    }

    fn id(s: &str) -> StageId {
        StageId::new(s)
    }

    #[test]
    fn test_add_and_query_dependencies() {
        let mut graph = graph_with(&[("a", "i1"), ("b", "i1"), ("c", "i1")]);
        graph.add_dependency(&id("b"), &id("a")).unwrap();
        graph.add_dependency(&id("c"), &id("a")).unwrap();

        assert_eq!(graph.dependencies_of(&id("b")).unwrap(), BTreeSet::from([id("a")]));
        assert_eq!(
            graph.dependents_of(&id("a")).unwrap(),
            BTreeSet::from([id("b"), id("c")])
        );
        assert!(graph.dependencies_of(&id("a")).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_dependency_rejected() {
        let mut graph = graph_with(&[("a", "i1"), ("b", "i1")]);
        graph.add_dependency(&id("b"), &id("a")).unwrap();
        let err = graph.add_dependency(&id("b"), &id("a")).unwrap_err();
        assert!(matches!(err, Error::DuplicateDependency { .. }));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_unknown_stage_is_not_found() {
        let mut graph = graph_with(&[("a", "i1")]);
        let err = graph.add_dependency(&id("a"), &id("ghost")).unwrap_err();
        assert!(matches!(err, Error::StageNotFound(ref s) if s == &id("ghost")));
    }

    #[test]
    fn test_remove_missing_dependency() {
        let mut graph = graph_with(&[("a", "i1"), ("b", "i1")]);
        let err = graph.remove_dependency(&id("b"), &id("a")).unwrap_err();
        assert!(matches!(err, Error::DependencyNotFound { .. }));
    }

    #[test]
    fn test_delete_cascades_edges_and_keeps_indices_valid() {
        let mut graph = graph_with(&[("a", "i1"), ("b", "i1"), ("c", "i1"), ("d", "i1")]);
        graph.add_dependency(&id("b"), &id("a")).unwrap();
        graph.add_dependency(&id("c"), &id("b")).unwrap();
        graph.add_dependency(&id("d"), &id("c")).unwrap();

        let removed = graph.delete_stage(&id("b")).unwrap();
        assert_eq!(removed.id, id("b"));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.dependents_of(&id("a")).unwrap().is_empty());
        assert!(graph.dependencies_of(&id("c")).unwrap().is_empty());
        // Remaining nodes still resolve to the right stages.
        assert_eq!(graph.dependencies_of(&id("d")).unwrap(), BTreeSet::from([id("c")]));
    }

    #[test]
    fn test_same_item_helpers_skip_cross_item_edges() {
        let mut graph = graph_with(&[("a", "i1"), ("b", "i1"), ("x", "i2")]);
        graph.add_dependency(&id("b"), &id("a")).unwrap();
        graph.add_dependency(&id("b"), &id("x")).unwrap();

        let prereqs: Vec<&str> = graph
            .same_item_prerequisites(&id("b"))
            .unwrap()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(prereqs, vec!["a"]);
        assert_eq!(graph.dependencies_of(&id("b")).unwrap().len(), 2);
    }

    #[test]
    fn test_records_round_trip_through_from_records() {
        let mut graph = graph_with(&[("a", "i1"), ("b", "i1"), ("x", "i2")]);
        graph.add_dependency(&id("b"), &id("a")).unwrap();
        graph.add_dependency(&id("x"), &id("b")).unwrap();

        let (rebuilt, warnings) = StageGraph::from_records(graph.to_records());
        assert!(warnings.is_empty());
        assert_eq!(rebuilt.len(), 3);
        assert_eq!(rebuilt.dependencies(), graph.dependencies());
    }

    #[test]
    fn test_from_records_skips_cycles_and_orphans() {
        let records = vec![
            StageRecord {
                stage: Stage::new("a", "i1", "A"),
                depends_on: vec![id("b")],
            },
            StageRecord {
                stage: Stage::new("b", "i1", "B"),
                depends_on: vec![id("a"), id("missing")],
            },
        ];
        let (graph, warnings) = StageGraph::from_records(records);
        assert_eq!(graph.edge_count(), 1);
        assert!(warnings.contains(&LoadWarning::CircularDependency {
            from: id("b"),
            to: id("a"),
        }));
        assert!(warnings.contains(&LoadWarning::OrphanedDependency {
            from: id("b"),
            to: id("missing"),
        }));
    }

    #[test]
    fn test_update_keeps_status() {
        let mut graph = graph_with(&[("a", "i1")]);
        let updated = graph
            .update_stage(
                &id("a"),
                StageUpdate {
                    name: Some("Measurement".to_string()),
                    order: Some(7),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Measurement");
        assert_eq!(updated.order, 7);
        assert_eq!(updated.status, StageStatus::Pending);
    }
}
