//! Integration tests for the stagegraph CLI.

use rstest::{fixture, rstest};
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

mod common;
use common::run_stagegraph_in_dir;

// ============================================================================
// Test Fixtures
// ============================================================================

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// A temporary directory with an initialized repository
#[fixture]
fn initialized_dir() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let output = run_stagegraph_in_dir(temp.path(), &["init", "--prefix", "test", "--quiet"]);
    assert!(
        output.status.success(),
        "Failed to initialize: {:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    temp
}

fn json(dir: &Path, args: &[&str]) -> Value {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let output = run_stagegraph_in_dir(dir, &full);
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn add(dir: &Path, item: &str, name: &str, extra: &[&str]) -> String {
    let mut args = vec!["add", "--item", item, "--name", name];
    args.extend_from_slice(extra);
    json(dir, &args)["id"]
        .as_str()
        .expect("created stage has an id")
        .to_string()
}

// ============================================================================
// Init
// ============================================================================

#[rstest]
fn test_init_creates_repository(temp_dir: TempDir) {
    let output = run_stagegraph_in_dir(temp_dir.path(), &["init", "--prefix", "shop"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Stage prefix: shop"));
    assert!(temp_dir.path().join(".stagegraph/config.yaml").exists());
    assert!(temp_dir.path().join(".stagegraph/stages.jsonl").exists());
}

#[rstest]
fn test_commands_fail_outside_repository(temp_dir: TempDir) {
    let output = run_stagegraph_in_dir(temp_dir.path(), &["list"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not a stagegraph repository"));
}

// ============================================================================
// Workflow
// ============================================================================

#[rstest]
fn test_add_and_show(initialized_dir: TempDir) {
    let dir = initialized_dir.path();
    let a = add(dir, "kitchen-1", "Measurement", &[]);
    let b = add(dir, "kitchen-1", "Design", &["--order", "1", "--deps", &a]);

    assert!(a.starts_with("test-"));

    let shown = json(dir, &["show", &b]);
    assert_eq!(shown["name"], "Design");
    assert_eq!(shown["dependencies"][0]["id"], a.as_str());
    assert_eq!(shown["annotation"]["level"], 1);
}

#[rstest]
fn test_cycle_is_rejected(initialized_dir: TempDir) {
    let dir = initialized_dir.path();
    let a = add(dir, "kitchen-1", "Measurement", &[]);
    let b = add(dir, "kitchen-1", "Design", &["--deps", &a]);
    let c = add(dir, "kitchen-1", "Production", &["--deps", &b]);

    let output = run_stagegraph_in_dir(dir, &["dep", "add", &a, &c]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Circular dependency"), "stderr: {stderr}");

    let shown = json(dir, &["show", &a]);
    assert!(shown["dependencies"].as_array().unwrap().is_empty());
}

#[rstest]
fn test_status_gate_and_ready(initialized_dir: TempDir) {
    let dir = initialized_dir.path();
    let a = add(dir, "kitchen-1", "Measurement", &[]);
    let b = add(dir, "kitchen-1", "Design", &["--deps", &a]);

    let output = run_stagegraph_in_dir(dir, &["status", &b, "in_progress"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("finish Measurement first"), "stderr: {stderr}");

    let ready = json(dir, &["ready", "--item", "kitchen-1"]);
    let ready_ids: Vec<&str> = ready
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ready_ids, vec![a.as_str()]);

    let blocked = json(dir, &["blocked"]);
    assert_eq!(blocked[0]["id"], b.as_str());
    assert_eq!(blocked[0]["blocked_by"][0]["name"], "Measurement");

    json(dir, &["status", &a, "completed"]);
    let change = json(dir, &["status", &b, "in-progress"]);
    assert_eq!(change["previous"], "pending");
    assert_eq!(change["current"], "in_progress");
}

#[rstest]
fn test_chains_output(initialized_dir: TempDir) {
    let dir = initialized_dir.path();
    let a = add(dir, "kitchen-1", "Measurement", &[]);
    add(dir, "kitchen-1", "Design", &["--order", "1", "--deps", &a]);
    add(dir, "kitchen-1", "Cleanup", &["--order", "9"]);

    let chains = json(dir, &["chains", "--item", "kitchen-1"]);
    assert_eq!(chains["chains"].as_array().unwrap().len(), 1);
    assert_eq!(chains["chains"][0]["color"], "#3b82f6");
    assert_eq!(chains["annotations"].as_array().unwrap().len(), 3);

    let output = run_stagegraph_in_dir(dir, &["chains", "--item", "kitchen-1"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Item kitchen-1: 1 chain(s)"));
    assert!(stdout.contains("Unchained (1):"));
}

#[rstest]
fn test_delay_report(initialized_dir: TempDir) {
    let dir = initialized_dir.path();
    let f = add(dir, "kitchen-1", "Production", &["--end", "2024-03-09T12:00:00Z"]);
    let g = add(dir, "kitchen-1", "Delivery", &["--order", "1", "--deps", &f]);
    json(dir, &["status", &f, "in_progress"]);

    let report = json(dir, &["delay", "--now", "2024-03-10T12:00:00Z"]);
    assert_eq!(report["total_delay_days"], 1);
    assert_eq!(report["delayed"][0]["stage_id"], f.as_str());
    let critical: Vec<&str> = report["critical"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(critical.contains(&f.as_str()));
    assert!(critical.contains(&g.as_str()));
}

#[rstest]
fn test_delete_cascades(initialized_dir: TempDir) {
    let dir = initialized_dir.path();
    let a = add(dir, "kitchen-1", "Measurement", &[]);
    let b = add(dir, "kitchen-1", "Design", &["--deps", &a]);

    json(dir, &["delete", &a]);

    let shown = json(dir, &["show", &b]);
    assert!(shown["dependencies"].as_array().unwrap().is_empty());
    let list = json(dir, &["list"]);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[rstest]
fn test_dep_remove_then_list(initialized_dir: TempDir) {
    let dir = initialized_dir.path();
    let a = add(dir, "kitchen-1", "Measurement", &[]);
    let b = add(dir, "kitchen-1", "Design", &["--deps", &a]);

    json(dir, &["dep", "remove", &b, &a]);
    let listed = json(dir, &["dep", "list", &b]);
    assert!(listed["dependencies"].as_array().unwrap().is_empty());

    json(dir, &["dep", "add", &b, &a]);
    let listed = json(dir, &["dep", "list", &a]);
    assert_eq!(listed["dependents"][0]["id"], b.as_str());
}
