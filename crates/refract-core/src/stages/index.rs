//! Aggregate metadata index, rebuilt in full after every metadata pass.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;
use crate::output;
use crate::types::MetadataRecord;

/// File name of the index inside the metadata root.
pub const INDEX_FILE_NAME: &str = "all_metadata.json";

/// Summary of one index rebuild.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub path: PathBuf,
    pub entries: usize,
    /// Documents that failed to parse
    pub skipped: usize,
}

/// Walk `meta_root` and write every parseable record into
/// `<meta_root>/all_metadata.json`, keyed by `/`-joined relative path.
///
/// Returns `Ok(None)` when the root does not exist.
pub fn build_index(meta_root: &Path) -> Result<Option<IndexReport>> {
    if !meta_root.is_dir() {
        tracing::warn!("Metadata root directory does not exist: {}", meta_root.display());
        return Ok(None);
    }

    let mut index: BTreeMap<String, MetadataRecord> = BTreeMap::new();
    let mut skipped = 0;

    for entry in WalkDir::new(meta_root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_record(path) {
            continue;
        }
        let Some(key) = relative_key(meta_root, path) else {
            continue;
        };
        match MetadataRecord::load(path) {
            Ok(record) => {
                index.insert(key, record);
            }
            Err(e) => {
                tracing::warn!("Failed to include metadata file {} in index: {e}", path.display());
                skipped += 1;
            }
        }
    }

    let index_path = meta_root.join(INDEX_FILE_NAME);
    output::write_json(&index_path, &index, true)?;
    tracing::info!(
        "Metadata index written to {} ({} items).",
        index_path.display(),
        index.len()
    );

    Ok(Some(IndexReport {
        path: index_path,
        entries: index.len(),
        skipped,
    }))
}

fn is_record(path: &Path) -> bool {
    let json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    json && path.file_name().and_then(|n| n.to_str()) != Some(INDEX_FILE_NAME)
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
