//! Atomic output writers.
//!
//! Output existence is the only idempotency signal, so every stage output is
//! written to a temporary file in the destination directory and renamed into
//! place. A killed process leaves at most a stray temp file, never a partial
//! output that would be mistaken for finished work.

use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{TaskError, TaskResult};

/// Create `path`'s parent directory and return it.
pub fn ensure_parent(path: &Path) -> TaskResult<&Path> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| TaskError::write(parent, e))?;
    Ok(parent)
}

/// A temp file next to `path`, ready to be filled and persisted.
pub fn temp_sibling(path: &Path) -> TaskResult<NamedTempFile> {
    let parent = ensure_parent(path)?;
    NamedTempFile::new_in(parent).map_err(|e| TaskError::write(path, e))
}

/// Rename a filled temp file onto `path`.
pub fn persist(temp: NamedTempFile, path: &Path) -> TaskResult<()> {
    temp.persist(path)
        .map(|_| ())
        .map_err(|e| TaskError::write(path, e.error))
}

/// Atomically write raw bytes.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> TaskResult<()> {
    let mut temp = temp_sibling(path)?;
    temp.write_all(bytes)
        .and_then(|_| temp.as_file_mut().sync_all())
        .map_err(|e| TaskError::write(path, e))?;
    persist(temp, path)
}

/// Atomically write a value as JSON, compact or pretty.
pub fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> TaskResult<()> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
    .map_err(|e| TaskError::write(path, e))?;
    write_bytes(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bytes_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.txt");
        write_bytes(&path, b"hello").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn test_write_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.json");
        write_json(&path, &serde_json::json!({"width": 1}), false).unwrap();
        write_json(&path, &serde_json::json!({"width": 2}), true).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"width\": 2"));
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_into_file_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let err = write_bytes(&blocker.join("child.txt"), b"x").unwrap_err();
        assert!(matches!(err, TaskError::WriteFailure { .. }));
    }
}
