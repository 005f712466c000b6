//! Cycle guard for proposed dependency edges.
//!
//! A proposed edge `from -> to` means "`from` will depend on `to`". It closes
//! a cycle exactly when `from` is already reachable from `to` by following
//! depends-on edges, since the new edge would then give the walk
//! `from -> to -> ... -> from`. The search therefore starts at `to` and walks
//! outgoing (prerequisite) edges looking for `from`.
//!
//! Only edges whose endpoints share the item of `from` are followed. A
//! proposed cross-item edge cannot close a same-item cycle and is accepted.

use super::StageGraph;
use crate::domain::StageId;
use crate::error::{Error, Result};
use petgraph::stable_graph::NodeIndex;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Validate the edge `from -> to` against the existing graph.
///
/// # Errors
///
/// - `Error::StageNotFound` if either stage doesn't exist
/// - `Error::SelfDependency` if `from == to`
/// - `Error::CircularDependency` with the closing path if the edge would
///   create a cycle
pub fn check_new_edge(graph: &StageGraph, from: &StageId, to: &StageId) -> Result<()> {
    let from_stage = graph.require_stage(from)?;
    let to_stage = graph.require_stage(to)?;

    if from == to {
        return Err(Error::SelfDependency(from.clone()));
    }

    if from_stage.item_id != to_stage.item_id {
        return Ok(());
    }

    if let Some(walk) = find_path(graph, to, from)? {
        let mut path = Vec::with_capacity(walk.len() + 1);
        path.push(from.clone());
        path.extend(walk);
        warn!(from = %from, to = %to, cycle_len = path.len() - 1, "Rejected circular dependency");
        return Err(Error::CircularDependency {
            from: from.clone(),
            to: to.clone(),
            path,
        });
    }

    Ok(())
}

/// Whether adding `from -> to` would create a cycle.
///
/// Same answer as [`check_new_edge`] without the error details.
pub fn would_create_cycle(graph: &StageGraph, from: &StageId, to: &StageId) -> Result<bool> {
    match check_new_edge(graph, from, to) {
        Ok(()) => Ok(false),
        Err(Error::SelfDependency(_) | Error::CircularDependency { .. }) => Ok(true),
        Err(other) => Err(other),
    }
}

/// Depth-first search from `start` along same-item prerequisite edges.
///
/// Returns the walk `start -> ... -> target` if `target` is reachable. The
/// visited set bounds the search to O(V + E) even on graphs that share
/// prerequisites heavily.
fn find_path(graph: &StageGraph, start: &StageId, target: &StageId) -> Result<Option<Vec<StageId>>> {
    let petgraph = graph.petgraph();
    let item = &graph.require_stage(start)?.item_id;
    let start_node = graph.node(start)?;
    let target_node = graph.node(target)?;

    let mut visited: HashSet<NodeIndex> = HashSet::from([start_node]);
    let mut came_from: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut stack = vec![start_node];

    while let Some(node) = stack.pop() {
        if node == target_node {
            return Ok(Some(rebuild_walk(graph, &came_from, start_node, target_node)));
        }

        for next in petgraph.neighbors_directed(node, Direction::Outgoing) {
            let next_id = &petgraph[next];
            let same_item = graph
                .stage(next_id)
                .map(|stage| &stage.item_id == item)
                .ok_or_else(|| {
                    Error::Internal(format!("graph node {} has no stage record", next_id))
                })?;
            if same_item && visited.insert(next) {
                came_from.insert(next, node);
                stack.push(next);
            }
        }
    }

    Ok(None)
}

fn rebuild_walk(
    graph: &StageGraph,
    came_from: &HashMap<NodeIndex, NodeIndex>,
    start: NodeIndex,
    target: NodeIndex,
) -> Vec<StageId> {
    let petgraph = graph.petgraph();
    let mut walk = vec![petgraph[target].clone()];
    let mut current = target;
    while current != start {
        let Some(&prev) = came_from.get(&current) else {
            break;
        };
        walk.push(petgraph[prev].clone());
        current = prev;
    }
    walk.reverse();
    walk
}
