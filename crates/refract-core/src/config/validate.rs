//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.processing.image_extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "processing.image_extensions must not be empty".into(),
            ));
        }
        if self.upload.max_pixels == 0 {
            return Err(ConfigError::ValidationError(
                "upload.max_pixels must be > 0".into(),
            ));
        }
        if self.upload.max_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "upload.max_bytes must be > 0".into(),
            ));
        }
        let upload = &self.upload;
        if !(1..=100).contains(&upload.start_quality) || !(1..=100).contains(&upload.min_quality) {
            return Err(ConfigError::ValidationError(
                "upload.start_quality and upload.min_quality must be between 1 and 100".into(),
            ));
        }
        if upload.min_quality > upload.start_quality {
            return Err(ConfigError::ValidationError(
                "upload.min_quality must be <= upload.start_quality".into(),
            ));
        }
        if upload.quality_step == 0 {
            return Err(ConfigError::ValidationError(
                "upload.quality_step must be > 0".into(),
            ));
        }
        let limits = &self.generation.limits;
        if limits.min_short_side == 0
            || limits.min_short_side > limits.min_long_side
            || limits.min_long_side > limits.max_side
        {
            return Err(ConfigError::ValidationError(
                "generation.limits must satisfy 0 < min_short_side <= min_long_side <= max_side"
                    .into(),
            ));
        }
        if self.generation.fixed_size.trim().is_empty()
            && (self.generation.width == 0 || self.generation.height == 0)
        {
            return Err(ConfigError::ValidationError(
                "generation.width and generation.height must be > 0 when fixed_size is empty"
                    .into(),
            ));
        }
        if self.generation.max_images == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_images must be > 0".into(),
            ));
        }
        if self.limits.request_timeout_ms == 0 || self.limits.download_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.request_timeout_ms and limits.download_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}
