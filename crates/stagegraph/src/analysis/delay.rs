//! Schedule slippage and its downstream reach.
//!
//! A stage is delayed when it is `in_progress` and "now" is past its planned
//! end. Pending stages have not started their clock and completed stages are
//! done, so neither counts. The critical set is every delayed stage plus
//! everything that transitively waits on one through same-item edges.
//!
//! The total is a plain sum of per-stage delays. It is a warning signal, not a
//! critical-path-method schedule with float and slack.

use crate::domain::{ItemId, Stage, StageId, StageStatus};
use crate::error::Result;
use crate::graph::StageGraph;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

const MILLIS_PER_DAY: u64 = 86_400_000;

/// Whole days a stage is overdue, rounded up; 0 when not delayed.
pub fn delay_of(stage: &Stage, now: DateTime<Utc>) -> u64 {
    if stage.status != StageStatus::InProgress {
        return 0;
    }
    let Some(end) = stage.planned_end_date else {
        return 0;
    };
    let overdue = (now - end).num_milliseconds();
    if overdue <= 0 {
        return 0;
    }
    overdue.unsigned_abs().div_ceil(MILLIS_PER_DAY)
}

/// A delayed stage and how late it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDelay {
    /// The delayed stage
    pub stage_id: StageId,
    /// Its item
    pub item_id: ItemId,
    /// Display name
    pub name: String,
    /// Days past the planned end
    pub days: u64,
}

/// Delays, critical set and total delay for an item or a whole project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelayReport {
    /// Reference time used for the computation
    pub now: DateTime<Utc>,
    /// Delayed stages, by item and display order
    pub delayed: Vec<StageDelay>,
    /// Delayed stages and everything downstream of them
    pub critical: BTreeSet<StageId>,
    /// Sum of all per-stage delays in days
    pub total_delay_days: u64,
}

impl DelayReport {
    /// Report for the stages of one item.
    pub fn for_item(graph: &StageGraph, item_id: &ItemId, now: DateTime<Utc>) -> Result<Self> {
        let stages = graph.stages_for_item(item_id);

        let delayed: Vec<StageDelay> = stages
            .iter()
            .filter_map(|stage| {
                let days = delay_of(stage, now);
                (days > 0).then(|| StageDelay {
                    stage_id: stage.id.clone(),
                    item_id: stage.item_id.clone(),
                    name: stage.name.clone(),
                    days,
                })
            })
            .collect();

        let critical = propagate(graph, delayed.iter().map(|d| &d.stage_id))?;
        let total_delay_days = delayed.iter().map(|d| d.days).sum();

        if total_delay_days > 0 {
            debug!(
                item = %item_id,
                delayed = delayed.len(),
                critical = critical.len(),
                total_delay_days,
                "Item is behind schedule"
            );
        }

        Ok(Self {
            now,
            delayed,
            critical,
            total_delay_days,
        })
    }

    /// Report across every item of the graph.
    pub fn for_project(graph: &StageGraph, now: DateTime<Utc>) -> Result<Self> {
        let mut report = Self {
            now,
            delayed: Vec::new(),
            critical: BTreeSet::new(),
            total_delay_days: 0,
        };
        for item in graph.items() {
            let item_report = Self::for_item(graph, &item, now)?;
            report.delayed.extend(item_report.delayed);
            report.critical.extend(item_report.critical);
            report.total_delay_days += item_report.total_delay_days;
        }
        Ok(report)
    }

    /// Whether a stage is delayed or downstream of a delay.
    pub fn is_critical(&self, id: &StageId) -> bool {
        self.critical.contains(id)
    }

    /// Delay in days for a stage; 0 if it is on schedule.
    pub fn days_for(&self, id: &StageId) -> u64 {
        self.delayed
            .iter()
            .find(|d| &d.stage_id == id)
            .map_or(0, |d| d.days)
    }
}

/// Forward BFS from `seeds` over same-item dependents.
fn propagate<'a>(
    graph: &StageGraph,
    seeds: impl Iterator<Item = &'a StageId>,
) -> Result<BTreeSet<StageId>> {
    let mut critical: BTreeSet<StageId> = BTreeSet::new();
    let mut queue: VecDeque<StageId> = VecDeque::new();

    for seed in seeds {
        if critical.insert(seed.clone()) {
            queue.push_back(seed.clone());
        }
    }

    while let Some(id) = queue.pop_front() {
        for dependent in graph.same_item_dependents(&id)? {
            if critical.insert(dependent.id.clone()) {
                queue.push_back(dependent.id.clone());
            }
        }
    }

    Ok(critical)
}
