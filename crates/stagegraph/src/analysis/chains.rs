//! Chain and level annotations for one item's stages.
//!
//! A chain is a connected component of same-item dependency edges, with edge
//! direction ignored. Chains are numbered and colored in the order their
//! first stage is encountered when walking the item's stages by `order`, then
//! ID. Stages without any same-item edge belong to no chain.
//!
//! Levels are longest-path depths: 0 for a stage with no prerequisites,
//! otherwise one more than its deepest prerequisite. They are computed with
//! Kahn's algorithm, so the pass is linear and needs no recursion.
//!
//! Chain IDs and colors are display hints. They shift when stages are
//! reordered and must not be stored as identity.

use crate::domain::{ItemId, StageId};
use crate::error::{Error, Result};
use crate::graph::StageGraph;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// Colors cycled through when numbering chains.
pub const DEFAULT_PALETTE: [&str; 8] = [
    "#3b82f6", // blue
    "#10b981", // emerald
    "#f59e0b", // amber
    "#ef4444", // red
    "#8b5cf6", // violet
    "#ec4899", // pink
    "#06b6d4", // cyan
    "#84cc16", // lime
];

/// Ordered list of display colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette(Vec<String>);

impl Palette {
    /// Build a palette from explicit colors, falling back to the default when empty.
    pub fn new(colors: Vec<String>) -> Self {
        if colors.is_empty() {
            Self::default()
        } else {
            Self(colors)
        }
    }

    /// Color for the chain with the given index, cycling when exhausted.
    pub fn color(&self, chain_id: usize) -> &str {
        &self.0[chain_id % self.0.len()]
    }

    /// Number of distinct colors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; a palette holds at least one color.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self(DEFAULT_PALETTE.iter().map(|c| (*c).to_string()).collect())
    }
}

/// Display annotation for a single stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageAnnotation {
    /// The annotated stage
    pub stage_id: StageId,
    /// Chain the stage belongs to, if it has any same-item edge
    pub chain_id: Option<usize>,
    /// Chain color, if the stage is in a chain
    pub color: Option<String>,
    /// Longest-path depth from a root prerequisite
    pub level: usize,
    /// Whether the stage has same-item prerequisites
    pub has_parents: bool,
    /// Whether same-item stages depend on this one
    pub has_children: bool,
}

/// One connected component of stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chain {
    /// Index in first-encountered order
    pub id: usize,
    /// Display color
    pub color: String,
    /// Member stages in display order
    pub members: Vec<StageId>,
}

/// Chains and per-stage annotations for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainAnalysis {
    /// The analyzed item
    pub item_id: ItemId,
    /// Chains in first-encountered order
    pub chains: Vec<Chain>,
    /// One annotation per stage of the item, in display order
    pub annotations: Vec<StageAnnotation>,
}

impl ChainAnalysis {
    /// Analyze the stages of `item_id`.
    ///
    /// An item with no stages yields an empty analysis.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the item's edges contain a cycle, which the
    /// cycle guard should have made impossible.
    pub fn for_item(graph: &StageGraph, item_id: &ItemId, palette: &Palette) -> Result<Self> {
        let stages = graph.stages_for_item(item_id);
        let levels = compute_levels(graph, item_id)?;

        let mut chain_of: HashMap<&StageId, usize> = HashMap::new();
        let mut chains: Vec<Chain> = Vec::new();

        for stage in &stages {
            if chain_of.contains_key(&stage.id) {
                continue;
            }
            let component = component_of(graph, &stage.id)?;
            if component.len() < 2 {
                continue;
            }

            let chain_id = chains.len();
            let mut members: Vec<StageId> = Vec::with_capacity(component.len());
            for member in &stages {
                if component.contains(&member.id) {
                    chain_of.insert(&member.id, chain_id);
                    members.push(member.id.clone());
                }
            }
            chains.push(Chain {
                id: chain_id,
                color: palette.color(chain_id).to_string(),
                members,
            });
        }

        let mut annotations = Vec::with_capacity(stages.len());
        for stage in &stages {
            let chain_id = chain_of.get(&stage.id).copied();
            annotations.push(StageAnnotation {
                stage_id: stage.id.clone(),
                chain_id,
                color: chain_id.map(|id| palette.color(id).to_string()),
                level: levels.get(&stage.id).copied().unwrap_or(0),
                has_parents: !graph.same_item_prerequisites(&stage.id)?.is_empty(),
                has_children: !graph.same_item_dependents(&stage.id)?.is_empty(),
            });
        }

        Ok(Self {
            item_id: item_id.clone(),
            chains,
            annotations,
        })
    }

    /// Annotation for a stage of this item.
    pub fn annotation(&self, id: &StageId) -> Option<&StageAnnotation> {
        self.annotations.iter().find(|a| &a.stage_id == id)
    }

    /// Level of a stage of this item.
    pub fn level(&self, id: &StageId) -> Option<usize> {
        self.annotation(id).map(|a| a.level)
    }

    /// Chain index of a stage, if it belongs to one.
    pub fn chain_id(&self, id: &StageId) -> Option<usize> {
        self.annotation(id).and_then(|a| a.chain_id)
    }
}

/// Same-item connected component containing `start`.
fn component_of(graph: &StageGraph, start: &StageId) -> Result<HashSet<StageId>> {
    let mut seen: HashSet<StageId> = HashSet::from([start.clone()]);
    let mut queue = VecDeque::from([start.clone()]);

    while let Some(id) = queue.pop_front() {
        let neighbors = graph
            .same_item_prerequisites(&id)?
            .into_iter()
            .chain(graph.same_item_dependents(&id)?);
        for neighbor in neighbors {
            if seen.insert(neighbor.id.clone()) {
                queue.push_back(neighbor.id.clone());
            }
        }
    }

    Ok(seen)
}

/// Longest-path levels for every stage of an item via Kahn's algorithm.
pub fn compute_levels(graph: &StageGraph, item_id: &ItemId) -> Result<HashMap<StageId, usize>> {
    let stages = graph.stages_for_item(item_id);

    let mut remaining: HashMap<&StageId, usize> = HashMap::with_capacity(stages.len());
    let mut levels: HashMap<StageId, usize> = HashMap::with_capacity(stages.len());
    let mut queue = VecDeque::new();

    for stage in &stages {
        let prerequisites = graph.same_item_prerequisites(&stage.id)?.len();
        remaining.insert(&stage.id, prerequisites);
        if prerequisites == 0 {
            levels.insert(stage.id.clone(), 0);
            queue.push_back(&stage.id);
        }
    }

    let mut processed = 0usize;
    while let Some(id) = queue.pop_front() {
        processed += 1;
        let level = levels.get(id).copied().unwrap_or(0);

        for dependent in graph.same_item_dependents(id)? {
            let entry = levels.entry(dependent.id.clone()).or_insert(0);
            *entry = (*entry).max(level + 1);

            let count = remaining.get_mut(&dependent.id).ok_or_else(|| {
                Error::Internal(format!(
                    "stage {} depends on {} but is missing from item {}",
                    dependent.id, id, item_id
                ))
            })?;
            *count -= 1;
            if *count == 0 {
                queue.push_back(&dependent.id);
            }
        }
    }

    if processed != stages.len() {
        return Err(Error::Internal(format!(
            "dependency cycle among {} stages of item {}",
            stages.len() - processed,
            item_id
        )));
    }

    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stage;

    fn build(stages: &[&str], edges: &[(&str, &str)]) -> StageGraph {
        let mut graph = StageGraph::new();
        for (order, id) in stages.iter().enumerate() {
            let mut stage = Stage::new(*id, "item-1", id.to_uppercase());
            stage.order = order as i32;
            graph.insert_stage(stage).unwrap();
        }
        for (from, to) in edges {
            graph.add_dependency(&(*from).into(), &(*to).into()).unwrap();
        }
        graph
    }

    #[test]
    fn test_diamond_levels_take_longest_path() {
        // d depends on b and c, c depends on b, b depends on a
        let graph = build(
            &["a", "b", "c", "d"],
            &[("b", "a"), ("c", "b"), ("d", "b"), ("d", "c")],
        );
        let levels = compute_levels(&graph, &"item-1".into()).unwrap();
        assert_eq!(levels[&StageId::new("a")], 0);
        assert_eq!(levels[&StageId::new("b")], 1);
        assert_eq!(levels[&StageId::new("c")], 2);
        assert_eq!(levels[&StageId::new("d")], 3);
    }

    #[test]
    fn test_isolated_stage_has_no_chain() {
        let graph = build(&["a", "b", "lonely"], &[("b", "a")]);
        let analysis = ChainAnalysis::for_item(&graph, &"item-1".into(), &Palette::default()).unwrap();

        let lonely = analysis.annotation(&"lonely".into()).unwrap();
        assert_eq!(lonely.chain_id, None);
        assert_eq!(lonely.color, None);
        assert_eq!(lonely.level, 0);
        assert!(!lonely.has_parents && !lonely.has_children);

        assert_eq!(analysis.chains.len(), 1);
        assert_eq!(analysis.chains[0].color, DEFAULT_PALETTE[0]);
    }

    #[test]
    fn test_palette_cycles() {
        let palette = Palette::new(vec!["red".to_string(), "blue".to_string()]);
        let graph = build(
            &["a1", "a2", "b1", "b2", "c1", "c2"],
            &[("a2", "a1"), ("b2", "b1"), ("c2", "c1")],
        );
        let analysis = ChainAnalysis::for_item(&graph, &"item-1".into(), &palette).unwrap();
        let colors: Vec<&str> = analysis.chains.iter().map(|c| c.color.as_str()).collect();
        assert_eq!(colors, vec!["red", "blue", "red"]);
    }

    #[test]
    fn test_empty_palette_falls_back_to_default() {
        assert_eq!(Palette::new(Vec::new()), Palette::default());
        assert_eq!(Palette::default().len(), 8);
    }

    #[test]
    fn test_unknown_item_is_empty() {
        let graph = build(&["a"], &[]);
        let analysis = ChainAnalysis::for_item(&graph, &"nope".into(), &Palette::default()).unwrap();
        assert!(analysis.chains.is_empty());
        assert!(analysis.annotations.is_empty());
    }
}
