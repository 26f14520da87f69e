//! Task discovery over a mirrored directory tree.
//!
//! The collector walks one source root, keeps files whose extension belongs
//! to the stage's input set, and asks the stage's naming rule where the
//! outputs live. Existence of an output on disk is the only "done" signal.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::types::TaskItem;

/// A source file together with its position relative to the walked root.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    /// Full path to the file
    pub path: PathBuf,
    /// Directory relative to the root; empty for files directly under it
    pub relative_dir: PathBuf,
    /// File name without its extension
    pub stem: String,
}

impl SourceEntry {
    fn from_path(root: &Path, path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?.to_string();
        let relative_dir = path
            .parent()
            .and_then(|parent| parent.strip_prefix(root).ok())
            .map(|rel| {
                if rel == Path::new(".") {
                    PathBuf::new()
                } else {
                    rel.to_path_buf()
                }
            })
            .unwrap_or_default();
        Some(Self {
            path: path.to_path_buf(),
            relative_dir,
            stem,
        })
    }

    /// `<root>/<relative_dir>/<stem>.<extension>`
    pub fn mirrored(&self, root: &Path, extension: &str) -> PathBuf {
        root.join(&self.relative_dir)
            .join(format!("{}.{extension}", self.stem))
    }

    /// `<root>/<relative_dir>/<prefix><stem>.<extension>`
    pub fn mirrored_with_prefix(&self, root: &Path, prefix: &str, extension: &str) -> PathBuf {
        root.join(&self.relative_dir)
            .join(format!("{prefix}{}.{extension}", self.stem))
    }
}

/// Items to run plus the number of files already done.
#[derive(Debug, Default)]
pub struct Collection {
    pub items: Vec<TaskItem>,
    pub skipped: usize,
}

/// Walks a root and emits pending task items.
pub struct TaskCollector {
    extensions: Vec<String>,
}

impl TaskCollector {
    /// Create a collector accepting the given extensions (case-insensitive,
    /// without the leading dot).
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Walk `root` and build one item per matching file with `naming`.
    ///
    /// An item is emitted when none of its done markers exist, or always
    /// when `overwrite` is set.
    pub fn collect<F>(&self, root: &Path, overwrite: bool, naming: F) -> Collection
    where
        F: Fn(&SourceEntry) -> TaskItem,
    {
        let mut collection = Collection::default();

        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::debug!("Skipping unreadable entry under {:?}: {err}", root);
                    None
                }
            })
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !self.is_supported(path) {
                continue;
            }
            let Some(source) = SourceEntry::from_path(root, path) else {
                continue;
            };

            let item = naming(&source);
            if overwrite || !item.is_done() {
                collection.items.push(item);
            } else {
                collection.skipped += 1;
            }
        }

        collection
    }

    /// Check if a file has one of the accepted extensions.
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext_lower)
            })
            .unwrap_or(false)
    }
}
