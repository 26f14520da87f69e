//! Dimension normalization for the text-to-image service.
//!
//! The generation service accepts sizes whose longest side lies in
//! `[min_long_side, max_side]` and whose shortest side is at least
//! `min_short_side`. `normalize` maps arbitrary source dimensions into that
//! box with one aspect-preserving scale per step:
//!
//! 1. shrink so the longest side is at most `max_side`
//! 2. grow so the longest side is at least `min_long_side`
//! 3. grow so the shortest side is at least `min_short_side`
//! 4. shrink again if step 3 pushed the longest side past `max_side`
//!
//! The ceiling is applied last so it always wins. On extreme aspect ratios
//! step 4 undoes step 3 and the final clamp forces the short side up to
//! `min_short_side`, giving up aspect fidelity rather than service
//! compatibility.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::config::{GenerationConfig, SizeMode};
use crate::error::{TaskError, TaskResult};
use crate::types::MetadataRecord;

/// Side-length limits of the generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeLimits {
    /// Ceiling for either side
    pub max_side: u32,
    /// Floor for the longest side
    pub min_long_side: u32,
    /// Floor for the shortest side
    pub min_short_side: u32,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            max_side: 4096,
            min_long_side: 1280,
            min_short_side: 720,
        }
    }
}

/// A concrete pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn longest(&self) -> u32 {
        self.width.max(self.height)
    }

    pub fn shortest(&self) -> u32 {
        self.width.min(self.height)
    }
}

/// The `size` value sent to the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationSize {
    /// A service-defined token such as "2K"
    Named(String),
    /// Explicit `WxH`
    Pixels { width: u32, height: u32 },
}

impl fmt::Display for GenerationSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationSize::Named(token) => write!(f, "{token}"),
            GenerationSize::Pixels { width, height } => write!(f, "{width}x{height}"),
        }
    }
}

impl From<Dimensions> for GenerationSize {
    fn from(d: Dimensions) -> Self {
        GenerationSize::Pixels {
            width: d.width,
            height: d.height,
        }
    }
}

/// Map raw metadata dimensions into the service's size limits.
pub fn normalize(width: i64, height: i64, limits: &SizeLimits) -> TaskResult<Dimensions> {
    if width <= 0 || height <= 0 {
        return Err(TaskError::InvalidDimensions { width, height });
    }

    let max_side = f64::from(limits.max_side);
    let min_long = f64::from(limits.min_long_side);
    let min_short = f64::from(limits.min_short_side);

    let mut w = width as f64;
    let mut h = height as f64;
    let scale = |factor: f64, w: &mut f64, h: &mut f64| {
        *w *= factor;
        *h *= factor;
    };

    let longest = w.max(h);
    if longest > max_side {
        scale(max_side / longest, &mut w, &mut h);
    }

    let longest = w.max(h);
    if longest < min_long {
        scale(min_long / longest, &mut w, &mut h);
    }

    let shortest = w.min(h);
    if shortest < min_short {
        scale(min_short / shortest, &mut w, &mut h);
    }

    let longest = w.max(h);
    if longest > max_side {
        scale(max_side / longest, &mut w, &mut h);
    }

    let settle = |v: f64| (v.round() as u32).clamp(limits.min_short_side, limits.max_side);
    Ok(Dimensions {
        width: settle(w),
        height: settle(h),
    })
}

/// Pick the generation size for one prompt.
///
/// In `metadata` mode the sibling metadata record is read and normalized; a
/// missing, unparseable or non-positive record falls back to the fixed size
/// with a warning. Never fails.
pub fn resolve_generation_size(generation: &GenerationConfig, meta_path: &Path) -> GenerationSize {
    let fallback = generation.fallback_size();
    if generation.size_mode != SizeMode::Metadata {
        return fallback;
    }

    let record = match MetadataRecord::load(meta_path) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(
                "Metadata not found or invalid for {:?} ({e}), falling back to {fallback}",
                meta_path
            );
            return fallback;
        }
    };

    match normalize(record.width, record.height, &generation.limits) {
        Ok(dims) => dims.into(),
        Err(e) => {
            tracing::warn!(
                "Metadata invalid for {:?}: {e}, falling back to {fallback}",
                meta_path
            );
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: SizeLimits = SizeLimits {
        max_side: 4096,
        min_long_side: 1280,
        min_short_side: 720,
    };

    fn within_limits(d: Dimensions) -> bool {
        d.longest() <= LIMITS.max_side
            && d.longest() >= LIMITS.min_long_side
            && d.shortest() >= LIMITS.min_short_side
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(matches!(
            normalize(0, 100, &LIMITS),
            Err(TaskError::InvalidDimensions { width: 0, .. })
        ));
        assert!(normalize(100, -5, &LIMITS).is_err());
    }

    #[test]
    fn test_already_valid_is_unchanged() {
        let d = normalize(1920, 1080, &LIMITS).unwrap();
        assert_eq!((d.width, d.height), (1920, 1080));
    }

    #[test]
    fn test_scales_down_to_ceiling() {
        let d = normalize(8000, 6000, &LIMITS).unwrap();
        assert_eq!((d.width, d.height), (4096, 3072));
    }

    #[test]
    fn test_scales_up_small_images() {
        let d = normalize(640, 480, &LIMITS).unwrap();
        // longest -> 1280 gives 1280x960, short side already >= 720
        assert_eq!((d.width, d.height), (1280, 960));
    }

    #[test]
    fn test_short_side_floor_wins_over_long_floor() {
        // 1280x400 -> short side raised to 720 -> 2304x720
        let d = normalize(1280, 400, &LIMITS).unwrap();
        assert_eq!((d.width, d.height), (2304, 720));
    }

    #[test]
    fn test_extreme_aspect_ratio_reapplies_ceiling() {
        let d = normalize(100, 50_000, &LIMITS).unwrap();
        assert_eq!(d.height, 4096);
        assert_eq!(d.width, 720);
        assert!(d.width >= LIMITS.min_short_side && d.width <= LIMITS.max_side);
        assert!(d.height >= LIMITS.min_short_side && d.height <= LIMITS.max_side);
    }

    #[test]
    fn test_bounds_and_aspect_hold_across_sizes() {
        // Aspect ratios the box can represent without the final clamp.
        let max_ratio = f64::from(LIMITS.max_side) / f64::from(LIMITS.min_short_side);
        let sides = [1i64, 7, 90, 333, 720, 1000, 1280, 2048, 4096, 5000, 12_345, 100_000];
        for &w in &sides {
            for &h in &sides {
                let d = normalize(w, h, &LIMITS).unwrap();
                let ratio = w.max(h) as f64 / w.min(h) as f64;
                if ratio > max_ratio {
                    assert!(d.longest() <= LIMITS.max_side, "{w}x{h} -> {d:?}");
                    assert!(d.shortest() >= LIMITS.min_short_side, "{w}x{h} -> {d:?}");
                    continue;
                }
                assert!(within_limits(d), "{w}x{h} -> {d:?}");
                assert_eq!(w >= h, d.width >= d.height, "{w}x{h} -> {d:?}");
                let actual = f64::from(d.longest()) / f64::from(d.shortest());
                // Half a pixel of rounding on each side bounds the drift.
                let tolerance = ratio / f64::from(d.shortest()) + 1e-9;
                assert!(
                    (ratio - actual).abs() <= tolerance,
                    "{w}x{h} -> {d:?}: aspect {ratio} vs {actual}"
                );
            }
        }
    }

    #[test]
    fn test_generation_size_display() {
        assert_eq!(GenerationSize::Named("2K".into()).to_string(), "2K");
        assert_eq!(
            GenerationSize::Pixels {
                width: 1280,
                height: 720
            }
            .to_string(),
            "1280x720"
        );
    }

    #[test]
    fn test_fixed_mode_ignores_metadata() {
        let generation = GenerationConfig::default();
        let size = resolve_generation_size(&generation, Path::new("/nonexistent/a.json"));
        assert_eq!(size, GenerationSize::Named("2K".into()));
    }

    #[test]
    fn test_metadata_mode_normalizes_record() {
        let dir = tempfile::tempdir().unwrap();
        let meta = dir.path().join("a.json");
        std::fs::write(&meta, r#"{"width": 8000, "height": 6000}"#).unwrap();

        let generation = GenerationConfig {
            size_mode: SizeMode::Metadata,
            ..GenerationConfig::default()
        };
        let size = resolve_generation_size(&generation, &meta);
        assert_eq!(size.to_string(), "4096x3072");
    }

    #[test]
    fn test_metadata_mode_falls_back_on_missing_or_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let generation = GenerationConfig {
            size_mode: SizeMode::Metadata,
            fixed_size: String::new(),
            ..GenerationConfig::default()
        };

        let missing = resolve_generation_size(&generation, &dir.path().join("missing.json"));
        assert_eq!(missing.to_string(), "1920x1080");

        let zero = dir.path().join("zero.json");
        std::fs::write(&zero, r#"{"width": 0, "height": 600}"#).unwrap();
        assert_eq!(
            resolve_generation_size(&generation, &zero).to_string(),
            "1920x1080"
        );

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "not json").unwrap();
        assert_eq!(
            resolve_generation_size(&generation, &garbage).to_string(),
            "1920x1080"
        );
    }
}
