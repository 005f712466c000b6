//! JSONL persistence for stage graphs.
//!
//! Each line of the file is one [`StageRecord`]: the stage fields plus the IDs
//! of the stages it depends on. Loading is resilient: bad lines and bad edges
//! are skipped and reported as [`LoadWarning`]s instead of failing the load.

use super::in_memory::InMemoryStorageInner;
use super::StageRepository;
use crate::domain::StageRecord;
use crate::error::{Error, Result};
use crate::graph::{LoadWarning, StageGraph};
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;

/// Read stage records from a JSONL file.
///
/// Blank lines are ignored. Lines that fail to parse are skipped with a
/// [`LoadWarning::MalformedJson`] carrying the 1-based line number.
pub async fn read_records(path: &Path) -> Result<(Vec<StageRecord>, Vec<LoadWarning>)> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut records = Vec::new();
    let mut warnings = Vec::new();
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<StageRecord>(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => warnings.push(LoadWarning::MalformedJson {
                line_number,
                error: e.to_string(),
            }),
        }
    }

    Ok((records, warnings))
}

/// Load a repository from a JSONL file.
///
/// Stages are loaded before edges, so a record may depend on a stage that
/// appears later in the file. Orphaned and cycle-closing edges are dropped.
///
/// # Returns
///
/// The repository and every non-fatal problem found while loading.
pub async fn load_from_jsonl(
    path: &Path,
    prefix: String,
) -> Result<(Box<dyn StageRepository>, Vec<LoadWarning>)> {
    let (records, mut warnings) = read_records(path).await?;
    let (graph, graph_warnings) = StageGraph::from_records(records);
    warnings.extend(graph_warnings);

    tracing::debug!(
        path = %path.display(),
        stages = graph.len(),
        edges = graph.edge_count(),
        warnings = warnings.len(),
        "Loaded stage graph"
    );

    let storage = Arc::new(Mutex::new(InMemoryStorageInner::with_graph(prefix, graph)));
    Ok((Box::new(storage), warnings))
}

/// Save a repository to a JSONL file.
///
/// Writes to a sibling temp file and renames it over the target, so an
/// interrupted save leaves the previous file intact. Output order is
/// deterministic (item, order, ID) to keep version-control diffs small.
pub async fn save_to_jsonl(storage: &dyn StageRepository, path: &Path) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let graph = storage.snapshot().await?;

    let file = File::create(&temp_path).await?;
    let mut writer = BufWriter::new(file);

    for record in graph.to_records() {
        let json = serde_json::to_string(&record)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await?;

    tokio::fs::rename(&temp_path, path).await.map_err(Error::Io)?;
    Ok(())
}
