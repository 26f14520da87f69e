//! Retroactive `F_` prefixing of generated images.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::collector::TaskCollector;
use crate::error::TaskError;

/// Marks a generated image as finalized.
pub const FINAL_PREFIX: &str = "F_";

/// Counts from one prefixing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixReport {
    /// The output root did not exist
    pub root_missing: bool,
    pub renamed: usize,
    pub already_prefixed: usize,
    /// Existing targets plus failed renames
    pub collisions: usize,
}

/// Rename every image under `root` to its `F_` form.
///
/// Files already carrying the prefix are counted and left alone. An existing
/// target is never overwritten.
pub fn prefix_outputs(root: &Path, extensions: &[String]) -> PrefixReport {
    let mut report = PrefixReport::default();
    if !root.is_dir() {
        tracing::warn!("Directory does not exist: {}", root.display());
        report.root_missing = true;
        return report;
    }

    let filter = TaskCollector::new(extensions);
    // Snapshot first so renamed files are not walked again.
    let files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && filter.is_supported(e.path()))
        .map(|e| e.into_path())
        .collect();

    for path in files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(FINAL_PREFIX) {
            report.already_prefixed += 1;
            continue;
        }

        let target = path.with_file_name(format!("{FINAL_PREFIX}{name}"));
        if target.exists() {
            let err = TaskError::Collision {
                path: path.clone(),
                target,
            };
            tracing::warn!("{err}, skipping rename");
            report.collisions += 1;
            continue;
        }

        match std::fs::rename(&path, &target) {
            Ok(()) => report.renamed += 1,
            Err(e) => {
                tracing::warn!("Failed to rename {}: {e}", path.display());
                report.collisions += 1;
            }
        }
    }

    tracing::info!(
        "Prefixing completed. Renamed: {}, already prefixed: {}, collisions/errors: {}",
        report.renamed,
        report.already_prefixed,
        report.collisions
    );
    report
}
