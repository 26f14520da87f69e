//! `image`-crate backed codec.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageReader;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use super::{plan_reduction, ImageCodec, PreparedUpload, UploadBudget};
use crate::error::{TaskError, TaskResult};
use crate::sizing::Dimensions;

/// Reads headers for dimensions; resizes with Lanczos3 and re-encodes as
/// RGB8 JPEG with a descending quality ladder.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterCodec;

impl ImageCodec for RasterCodec {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn dimensions(&self, path: &Path) -> TaskResult<Dimensions> {
        let (width, height) = open_sniffed(path)?
            .into_dimensions()
            .map_err(|e| TaskError::unreadable(path, e))?;
        Ok(Dimensions { width, height })
    }

    fn prepare_upload(&self, path: &Path, budget: &UploadBudget) -> TaskResult<PreparedUpload> {
        let file_size = std::fs::metadata(path)
            .map_err(|e| TaskError::unreadable(path, e))?
            .len();
        let source = self.dimensions(path)?;

        let Some(plan) = plan_reduction(source, file_size, budget) else {
            return Ok(PreparedUpload::original(path));
        };

        let mut rgb = open_sniffed(path)?
            .decode()
            .map_err(|e| TaskError::unreadable(path, e))?
            .to_rgb8();
        if plan.resize {
            rgb = image::imageops::resize(
                &rgb,
                plan.target.width,
                plan.target.height,
                FilterType::Lanczos3,
            );
        }

        let mut buf = Vec::new();
        let mut used_quality = budget.start_quality;
        for quality in budget.qualities() {
            buf.clear();
            JpegEncoder::new_with_quality(&mut buf, quality)
                .encode_image(&rgb)
                .map_err(|e| TaskError::unreadable(path, e))?;
            used_quality = quality;
            if buf.len() as u64 <= budget.max_bytes {
                break;
            }
        }

        tracing::debug!(
            "Reduced {:?} {}x{} -> {}x{} at quality {used_quality} ({} -> {} bytes)",
            path,
            source.width,
            source.height,
            rgb.width(),
            rgb.height(),
            file_size,
            buf.len()
        );

        let mut temp = tempfile::Builder::new()
            .prefix("refract-upload-")
            .suffix(".jpg")
            .tempfile()
            .map_err(|e| TaskError::write(std::env::temp_dir(), e))?;
        temp.write_all(&buf)
            .map_err(|e| TaskError::write(temp.path(), e))?;

        Ok(PreparedUpload::temporary(temp.into_temp_path()))
    }
}

/// Open `path` with the format taken from its magic bytes, falling back to
/// the extension when the content is not recognized.
fn open_sniffed(path: &Path) -> TaskResult<ImageReader<BufReader<File>>> {
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| TaskError::unreadable(path, e))
}
