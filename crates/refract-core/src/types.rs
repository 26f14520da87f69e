//! Core data types shared by the collector, executor and stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One unit of pending work discovered by the collector.
///
/// Identity is the `output` path. `done_markers` lists every path whose
/// existence means the work has already been done (the output itself plus
/// any finalized alias).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    /// File read by the worker
    pub input: PathBuf,

    /// File written by the worker
    pub output: PathBuf,

    /// Paths that mark the item as done when any of them exists
    pub done_markers: Vec<PathBuf>,

    /// Sibling metadata record consulted when sizing generated images
    pub sidecar: Option<PathBuf>,
}

impl TaskItem {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        Self {
            input: input.into(),
            done_markers: vec![output.clone()],
            output,
            sidecar: None,
        }
    }

    /// Add another path that counts as "already done".
    pub fn with_marker(mut self, marker: impl Into<PathBuf>) -> Self {
        self.done_markers.push(marker.into());
        self
    }

    pub fn with_sidecar(mut self, sidecar: impl Into<PathBuf>) -> Self {
        self.sidecar = Some(sidecar.into());
        self
    }

    /// Whether any expected output already exists on disk.
    pub fn is_done(&self) -> bool {
        self.done_markers.iter().any(|p| p.exists())
    }
}

/// Result of executing one task item. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,

    /// Output path on success, input path on failure
    pub identifier: String,

    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Outcome {
    pub fn succeeded(output: &Path) -> Self {
        Self {
            success: true,
            identifier: output.display().to_string(),
            message: None,
        }
    }

    pub fn failed(input: &Path, message: impl Into<String>) -> Self {
        Self {
            success: false,
            identifier: input.display().to_string(),
            message: Some(message.into()),
        }
    }
}

/// Pixel dimensions of one source image, persisted as `<name>.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub width: i64,
    pub height: i64,
}

impl MetadataRecord {
    /// Read and parse a record from disk.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// The three media-transformation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Source image to metadata record
    Metadata,
    /// Source image to text description
    Describe,
    /// Text description to generated image
    Render,
}

impl Stage {
    /// Human-readable label used in progress and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Metadata => "Images -> Metadata",
            Stage::Describe => "Images -> Text",
            Stage::Render => "Text -> Images",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
