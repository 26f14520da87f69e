//! Image codec capability.
//!
//! Two operations need to look inside image files: reading pixel dimensions
//! for metadata records, and shrinking oversized images before upload. Both
//! sit behind [`ImageCodec`] so the rest of the crate never depends on the
//! codec being compiled in. [`detect`] picks the implementation once at
//! startup: [`RasterCodec`] with the `codec` feature, otherwise
//! [`PassthroughCodec`].

mod passthrough;
#[cfg(feature = "codec")]
mod raster;

pub use passthrough::PassthroughCodec;
#[cfg(feature = "codec")]
pub use raster::RasterCodec;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;

use crate::config::UploadConfig;
use crate::error::TaskResult;
use crate::sizing::Dimensions;

/// Reads and reshapes image files.
pub trait ImageCodec: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Pixel dimensions of the image at `path`.
    fn dimensions(&self, path: &Path) -> TaskResult<Dimensions>;

    /// Fit the image under `budget`, re-encoding to a temporary file when
    /// needed.
    fn prepare_upload(&self, path: &Path, budget: &UploadBudget) -> TaskResult<PreparedUpload>;
}

/// Pick the codec compiled into this build.
pub fn detect() -> Arc<dyn ImageCodec> {
    #[cfg(feature = "codec")]
    {
        Arc::new(RasterCodec)
    }
    #[cfg(not(feature = "codec"))]
    {
        tracing::warn!(
            "Built without the `codec` feature: oversized images are uploaded as-is \
             and metadata records cannot be generated"
        );
        Arc::new(PassthroughCodec::default())
    }
}

/// Pixel and byte limits an upload must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadBudget {
    pub max_pixels: u64,
    pub max_bytes: u64,
    pub start_quality: u8,
    pub quality_step: u8,
    pub min_quality: u8,
}

impl From<&UploadConfig> for UploadBudget {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_pixels: config.max_pixels,
            max_bytes: config.max_bytes,
            start_quality: config.start_quality,
            quality_step: config.quality_step,
            min_quality: config.min_quality,
        }
    }
}

impl Default for UploadBudget {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

impl UploadBudget {
    /// JPEG qualities to try, highest first, ending exactly at the floor.
    pub fn qualities(&self) -> impl Iterator<Item = u8> {
        let floor = self.min_quality.min(self.start_quality);
        let step = self.quality_step.max(1);
        std::iter::successors(Some(self.start_quality), move |&q| {
            (q > floor).then(|| q.saturating_sub(step).max(floor))
        })
    }
}

/// What has to happen to an image before it fits the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReductionPlan {
    /// Target size; equal to the source size when only re-encoding
    pub target: Dimensions,
    pub resize: bool,
    pub reencode: bool,
}

/// Decide whether an image needs resizing and/or re-encoding.
///
/// Resizing triggers when `width * height` exceeds the pixel budget and
/// scales both sides by `sqrt(budget / pixels)`, truncating and keeping at
/// least one pixel. Re-encoding triggers when the file exceeds the byte
/// budget. Returns `None` when the image already fits.
pub fn plan_reduction(source: Dimensions, file_size: u64, budget: &UploadBudget) -> Option<ReductionPlan> {
    let pixels = u64::from(source.width) * u64::from(source.height);
    let resize = pixels > budget.max_pixels;
    let reencode = file_size > budget.max_bytes;
    if !resize && !reencode {
        return None;
    }

    let scale = if resize {
        (budget.max_pixels as f64 / pixels as f64).sqrt().min(1.0)
    } else {
        1.0
    };
    let shrink = |side: u32| ((f64::from(side) * scale) as u32).max(1);
    let target = Dimensions {
        width: shrink(source.width),
        height: shrink(source.height),
    };

    Some(ReductionPlan {
        resize: target != source,
        target,
        reencode,
    })
}

/// An upload-ready file: either the original or a temporary re-encode.
///
/// The temporary file is removed by [`PreparedUpload::cleanup`], or on drop
/// if the caller bails out early.
#[derive(Debug)]
pub struct PreparedUpload {
    path: PathBuf,
    temp: Option<TempPath>,
}

impl PreparedUpload {
    /// The source file itself; nothing to clean up.
    pub fn original(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            temp: None,
        }
    }

    /// A temporary re-encoded copy owned by this value.
    pub fn temporary(temp: TempPath) -> Self {
        Self {
            path: temp.to_path_buf(),
            temp: Some(temp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }

    /// Remove the temporary copy, if any.
    pub fn cleanup(self) {
        if let Some(temp) = self.temp {
            if let Err(e) = temp.close() {
                tracing::warn!("Failed to remove temporary upload {:?}: {e}", self.path);
            }
        }
    }
}
