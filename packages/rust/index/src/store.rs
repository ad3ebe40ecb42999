//! Per-document artifact store.
//!
//! Each document identifier maps to one directory under the index root:
//!
//! ```text
//! <index_root>/<safe_id>/
//! ├── chunks.json    ordered chunk list
//! ├── index.json     the flat similarity index built from it
//! ├── meta.json      build metadata
//! └── summary.json   cached summary record (optional)
//! ```
//!
//! `chunks.json` and `index.json` are only meaningful as a pair: they are
//! written together (atomically, full replace) and loaded together, and a
//! missing or length-mismatched pair is NotFound rather than a partial
//! result.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use tenderlens_shared::{Chunk, IndexMeta, Result, SummaryRecord, TenderlensError};

use crate::flat::FlatIndex;

const CHUNKS_FILE: &str = "chunks.json";
const INDEX_FILE: &str = "index.json";
const META_FILE: &str = "meta.json";
const SUMMARY_FILE: &str = "summary.json";

/// Sanitize a document identifier to a filesystem-safe key.
pub fn safe_id(document_id: &str) -> String {
    document_id.replace(['/', '\\'], "_")
}

/// Directory holding a document's artifacts.
pub fn document_dir(index_root: &Path, document_id: &str) -> PathBuf {
    index_root.join(safe_id(document_id))
}

/// Persist a chunk list and its index as a unit.
///
/// A chunk/vector count mismatch is fatal: nothing is written.
#[instrument(skip_all, fields(document_id, chunks = chunks.len()))]
pub fn save_index(
    index_root: &Path,
    document_id: &str,
    chunks: &[Chunk],
    index: &FlatIndex,
    meta: &IndexMeta,
) -> Result<()> {
    if chunks.len() != index.len() {
        return Err(TenderlensError::validation(format!(
            "refusing to persist: {} chunks but {} vectors",
            chunks.len(),
            index.len()
        )));
    }

    let dir = document_dir(index_root, document_id);
    std::fs::create_dir_all(&dir).map_err(|e| TenderlensError::io(&dir, e))?;

    write_json_atomic(&dir.join(CHUNKS_FILE), &chunks)?;
    write_json_atomic(&dir.join(INDEX_FILE), index)?;
    write_json_atomic(&dir.join(META_FILE), meta)?;

    debug!(path = %dir.display(), "index artifacts written");
    Ok(())
}

/// Load a document's chunk list and index as a unit.
///
/// Missing artifacts — or a pair whose lengths disagree — surface as
/// [`TenderlensError::NotFound`], distinct from an empty result set.
#[instrument(skip_all, fields(document_id))]
pub fn load_index(index_root: &Path, document_id: &str) -> Result<(Vec<Chunk>, FlatIndex)> {
    let dir = document_dir(index_root, document_id);
    let chunks_path = dir.join(CHUNKS_FILE);
    let index_path = dir.join(INDEX_FILE);

    if !chunks_path.exists() || !index_path.exists() {
        return Err(TenderlensError::not_found(format!(
            "no index for '{document_id}'. Run ingestion first."
        )));
    }

    let chunks: Vec<Chunk> = read_json(&chunks_path)?;
    let index: FlatIndex = read_json(&index_path)?;

    if chunks.len() != index.len() {
        return Err(TenderlensError::not_found(format!(
            "index for '{document_id}' is unusable: {} chunks but {} vectors",
            chunks.len(),
            index.len()
        )));
    }

    Ok((chunks, index))
}

/// Load a document's build metadata, if present.
pub fn load_meta(index_root: &Path, document_id: &str) -> Result<Option<IndexMeta>> {
    let path = document_dir(index_root, document_id).join(META_FILE);
    if !path.exists() {
        return Ok(None);
    }
    read_json(&path).map(Some)
}

/// Load the cached summary record, if present and parseable.
///
/// An unreadable cache is treated as absent so the caller recomputes.
pub fn load_summary(index_root: &Path, document_id: &str) -> Option<SummaryRecord> {
    let path = document_dir(index_root, document_id).join(SUMMARY_FILE);
    if !path.exists() {
        return None;
    }
    match read_json(&path) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "discarding unreadable summary cache");
            None
        }
    }
}

/// Cache a summary record for a document.
pub fn save_summary(index_root: &Path, document_id: &str, record: &SummaryRecord) -> Result<()> {
    let dir = document_dir(index_root, document_id);
    std::fs::create_dir_all(&dir).map_err(|e| TenderlensError::io(&dir, e))?;
    write_json_atomic(&dir.join(SUMMARY_FILE), record)
}

/// All documents with artifacts under the index root, newest first.
///
/// Directories without a readable `meta.json` are skipped.
pub fn list_documents(index_root: &Path) -> Result<Vec<IndexMeta>> {
    if !index_root.exists() {
        return Ok(Vec::new());
    }

    let entries =
        std::fs::read_dir(index_root).map_err(|e| TenderlensError::io(index_root, e))?;

    let mut metas = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TenderlensError::io(index_root, e))?;
        let meta_path = entry.path().join(META_FILE);
        if !meta_path.exists() {
            continue;
        }
        match read_json::<IndexMeta>(&meta_path) {
            Ok(meta) => metas.push(meta),
            Err(e) => {
                warn!(path = %meta_path.display(), error = %e, "skipping unreadable meta");
            }
        }
    }

    metas.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(metas)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Write a JSON file atomically (write to temp, then rename).
fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string(data).map_err(|e| {
        TenderlensError::validation(format!("JSON serialization failed: {e}"))
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "artifact".to_string());
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, json).map_err(|e| TenderlensError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| TenderlensError::io(path, e))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| TenderlensError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        TenderlensError::validation(format!("invalid {}: {e}", path.display()))
    })
}
