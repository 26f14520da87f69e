//! Codec used when no raster support is compiled in.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ImageCodec, PreparedUpload, UploadBudget};
use crate::error::{TaskError, TaskResult};
use crate::sizing::Dimensions;

/// Uploads files unchanged and cannot read dimensions.
#[derive(Debug, Default)]
pub struct PassthroughCodec {
    warned: AtomicBool,
}

impl ImageCodec for PassthroughCodec {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn dimensions(&self, path: &Path) -> TaskResult<Dimensions> {
        Err(TaskError::unreadable(
            path,
            "no image codec available (build with the `codec` feature)",
        ))
    }

    fn prepare_upload(&self, path: &Path, budget: &UploadBudget) -> TaskResult<PreparedUpload> {
        let oversized = std::fs::metadata(path)
            .map(|m| m.len() > budget.max_bytes)
            .unwrap_or(false);
        if oversized && !self.warned.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "{:?} exceeds the upload byte budget but no image codec is available; \
                 uploading unchanged",
                path
            );
        }
        Ok(PreparedUpload::original(path))
    }
}
