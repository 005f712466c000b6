//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use stagegraph::domain::{Stage, StageId, StageStatus};
use stagegraph::graph::StageGraph;
use std::path::Path;
use std::process::{Command, Output};

/// Shorthand for a stage ID.
pub fn id(s: &str) -> StageId {
    StageId::new(s)
}

/// Fixed reference time used by delay tests: 2024-03-10 12:00 UTC.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

/// Insert a pending stage with the given display order.
pub fn add_stage(graph: &mut StageGraph, stage_id: &str, item: &str, name: &str, order: i32) {
    let mut stage = Stage::new(stage_id, item, name);
    stage.order = order;
    graph.insert_stage(stage).unwrap();
}

/// Set a status through the gate, panicking if the transition is refused.
pub fn set_status(graph: &mut StageGraph, stage_id: &str, status: StageStatus) {
    graph.set_status(&id(stage_id), status).unwrap();
}

/// Three stages of one item in a line: C depends on B, B depends on A.
pub fn abc_line() -> StageGraph {
    let mut graph = StageGraph::new();
    add_stage(&mut graph, "stg-a", "kitchen-1", "Measurement", 0);
    add_stage(&mut graph, "stg-b", "kitchen-1", "Design", 1);
    add_stage(&mut graph, "stg-c", "kitchen-1", "Production", 2);
    graph.add_dependency(&id("stg-b"), &id("stg-a")).unwrap();
    graph.add_dependency(&id("stg-c"), &id("stg-b")).unwrap();
    graph
}

/// Run the stagegraph binary in `dir` with colors disabled.
pub fn run_stagegraph_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stagegraph"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute stagegraph binary")
}
