//! Transition gate for stage status changes.
//!
//! A stage may move forward (out of `pending`, or into `completed`) only when
//! every direct prerequisite in the same item is `completed`. Backward moves
//! are always allowed. The gate owns no state: it reads the graph and answers.
//!
//! Reopening a completed stage to `pending` or `in_progress` is allowed and
//! re-enables blocking for its dependents, but dependents that already started
//! are left alone.

use crate::domain::{ItemId, Stage, StageId, StageStatus};
use crate::error::{Blocker, Error, Result};
use crate::graph::StageGraph;
use tracing::warn;

/// Decide whether `id` may move to `status`.
///
/// # Errors
///
/// - `Error::StageNotFound` if the stage doesn't exist
/// - `Error::BlockedTransition` listing the unfinished prerequisites
pub fn check_transition(graph: &StageGraph, id: &StageId, status: StageStatus) -> Result<()> {
    let current = graph.require_stage(id)?.status;
    if !current.is_gated_move(status) {
        return Ok(());
    }

    let blockers = blockers_of(graph, id)?;
    if blockers.is_empty() {
        return Ok(());
    }

    warn!(
        stage = %id,
        from = %current,
        to = %status,
        blockers = ?blockers.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
        "Transition refused"
    );
    Err(Error::BlockedTransition {
        stage: id.clone(),
        status,
        blockers,
    })
}

/// Unfinished same-item prerequisites of a stage, in display order.
pub fn blockers_of(graph: &StageGraph, id: &StageId) -> Result<Vec<Blocker>> {
    Ok(graph
        .same_item_prerequisites(id)?
        .into_iter()
        .filter(|stage| stage.status != StageStatus::Completed)
        .map(|stage| Blocker {
            id: stage.id.clone(),
            name: stage.name.clone(),
        })
        .collect())
}

/// Pending stages of an item whose prerequisites are all completed.
pub fn ready_stages<'a>(graph: &'a StageGraph, item_id: &ItemId) -> Result<Vec<&'a Stage>> {
    let mut ready = Vec::new();
    for stage in graph.stages_for_item(item_id) {
        if stage.status == StageStatus::Pending && blockers_of(graph, &stage.id)?.is_empty() {
            ready.push(stage);
        }
    }
    Ok(ready)
}

/// Every unfinished stage that could not currently move forward, with its blockers.
///
/// Sorted by item, then display order.
pub fn blocked_stages(graph: &StageGraph) -> Result<Vec<(&Stage, Vec<Blocker>)>> {
    let mut blocked = Vec::new();
    for item in graph.items() {
        for stage in graph.stages_for_item(&item) {
            if stage.status == StageStatus::Completed {
                continue;
            }
            let blockers = blockers_of(graph, &stage.id)?;
            if !blockers.is_empty() {
                blocked.push((stage, blockers));
            }
        }
    }
    Ok(blocked)
}
