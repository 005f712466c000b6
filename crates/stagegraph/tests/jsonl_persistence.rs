//! Integration tests for JSONL persistence and resilient loading.

use stagegraph::domain::{NewStage, StageStatus};
use stagegraph::storage::jsonl::{load_from_jsonl, read_records};
use stagegraph::storage::{create_storage, LoadWarning, StorageBackend};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

mod common;
use common::id;

// =============================================================================
// Test Helpers
// =============================================================================

fn create_temp_jsonl_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

fn stage_json(id: &str, name: &str, deps: &[&str]) -> String {
    let deps: Vec<String> = deps.iter().map(|d| format!("\"{d}\"")).collect();
    format!(
        r#"{{"id":"{id}","item_id":"kitchen-1","name":"{name}","status":"pending","order":0,"depends_on":[{}]}}"#,
        deps.join(",")
    )
}

// =============================================================================
// Resilient loading
// =============================================================================

#[tokio::test]
async fn loads_forward_references() {
    let content = [
        stage_json("stg-b", "Design", &["stg-a"]),
        stage_json("stg-a", "Measurement", &[]),
    ]
    .join("\n");
    let file = create_temp_jsonl_file(&content);

    let (storage, warnings) = load_from_jsonl(file.path(), "stg".to_string()).await.unwrap();

    assert!(warnings.is_empty(), "{warnings:?}");
    let deps = storage.dependencies_of(&id("stg-b")).await.unwrap();
    assert!(deps.contains(&id("stg-a")));
}

#[tokio::test]
async fn malformed_line_is_skipped_with_line_number() {
    let content = format!(
        "{}\n{{not json\n\n{}\n",
        stage_json("stg-a", "Measurement", &[]),
        stage_json("stg-b", "Design", &[])
    );
    let file = create_temp_jsonl_file(&content);

    let (records, warnings) = read_records(file.path()).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        warnings[0],
        LoadWarning::MalformedJson { line_number: 2, .. }
    ));
}

#[tokio::test]
async fn bad_edges_and_records_become_warnings() {
    let content = [
        stage_json("stg-a", "Measurement", &["stg-b"]),
        stage_json("stg-b", "Design", &["stg-a"]),
        stage_json("stg-c", "Production", &["stg-c", "stg-ghost"]),
        stage_json("stg-c", "Duplicate", &[]),
        stage_json("stg-d", "   ", &[]),
    ]
    .join("\n");
    let file = create_temp_jsonl_file(&content);

    let (storage, warnings) = load_from_jsonl(file.path(), "stg".to_string()).await.unwrap();

    let graph = storage.snapshot().await.unwrap();
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.edge_count(), 1);
    assert!(graph.has_dependency(&id("stg-a"), &id("stg-b")));

    assert!(warnings.contains(&LoadWarning::CircularDependency {
        from: id("stg-b"),
        to: id("stg-a"),
    }));
    assert!(warnings.contains(&LoadWarning::CircularDependency {
        from: id("stg-c"),
        to: id("stg-c"),
    }));
    assert!(warnings.contains(&LoadWarning::OrphanedDependency {
        from: id("stg-c"),
        to: id("stg-ghost"),
    }));
    assert!(warnings.contains(&LoadWarning::DuplicateStage {
        stage_id: id("stg-c"),
    }));
    assert!(warnings
        .iter()
        .any(|w| matches!(w, LoadWarning::InvalidStageData { stage_id, .. } if stage_id == &id("stg-d"))));
}

// =============================================================================
// Save / reload
// =============================================================================

#[tokio::test]
async fn save_and_reopen_preserves_stages_and_edges() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stages.jsonl");

    let mut storage = create_storage(StorageBackend::Jsonl(path.clone()), "stg".to_string())
        .await
        .unwrap();
    let measure = storage
        .create(NewStage::new("kitchen-1", "Measurement"))
        .await
        .unwrap();
    let mut design = NewStage::new("kitchen-1", "Design");
    design.order = 1;
    design.depends_on = vec![measure.id.clone()];
    let design = storage.create(design).await.unwrap();
    storage
        .set_status(&measure.id, StageStatus::Completed)
        .await
        .unwrap();
    storage.save().await.unwrap();

    assert!(!path.with_extension("tmp").exists());

    let reopened = create_storage(StorageBackend::Jsonl(path), "stg".to_string())
        .await
        .unwrap();
    let loaded = reopened.get(&measure.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, StageStatus::Completed);
    let deps = reopened.dependencies_of(&design.id).await.unwrap();
    assert!(deps.contains(&measure.id));
}

#[tokio::test]
async fn repeated_saves_are_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stages.jsonl");

    let mut storage = create_storage(StorageBackend::Jsonl(path.clone()), "stg".to_string())
        .await
        .unwrap();
    for name in ["Measurement", "Design", "Approval", "Production"] {
        storage
            .create(NewStage::new("kitchen-1", name))
            .await
            .unwrap();
    }

    storage.save().await.unwrap();
    let first = std::fs::read_to_string(&path).unwrap();
    storage.save().await.unwrap();
    let second = std::fs::read_to_string(&path).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.lines().count(), 4);
}

#[tokio::test]
async fn reload_discards_unsaved_changes() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stages.jsonl");

    let mut storage = create_storage(StorageBackend::Jsonl(path), "stg".to_string())
        .await
        .unwrap();
    let kept = storage
        .create(NewStage::new("kitchen-1", "Measurement"))
        .await
        .unwrap();
    storage.save().await.unwrap();

    let dropped = storage
        .create(NewStage::new("kitchen-1", "Design"))
        .await
        .unwrap();
    storage.reload().await.unwrap();

    assert!(storage.get(&kept.id).await.unwrap().is_some());
    assert!(storage.get(&dropped.id).await.unwrap().is_none());
}

#[tokio::test]
async fn missing_file_opens_empty() {
    let temp_dir = TempDir::new().unwrap();
    let storage = create_storage(
        StorageBackend::Jsonl(temp_dir.path().join("absent.jsonl")),
        "stg".to_string(),
    )
    .await
    .unwrap();

    assert!(storage.list(None).await.unwrap().is_empty());
}
