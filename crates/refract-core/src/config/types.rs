//! Sub-configuration structs with their defaults.

use crate::sizing::{GenerationSize, SizeLimits};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root directories of the four mirrored trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Source images
    pub source: PathBuf,

    /// Generated text descriptions (`<name>.txt`)
    pub text: PathBuf,

    /// Generated images (`<name>.jpg`)
    pub output: PathBuf,

    /// Per-image metadata records (`<name>.json`) and the aggregate index
    pub metadata: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("./data/real"),
            text: PathBuf::from("./data/text"),
            output: PathBuf::from("./data/output"),
            metadata: PathBuf::from("./data/meta"),
        }
    }
}

/// Regenerate outputs even when they already exist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverwriteConfig {
    /// Rewrite metadata records
    pub metadata: bool,

    /// Rewrite text descriptions
    pub text: bool,

    /// Regenerate output images
    pub images: bool,
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of concurrent workers per stage
    pub parallel_workers: usize,

    /// Show a progress bar while a stage runs
    pub progress: bool,

    /// Source image extensions (case-insensitive, without the dot)
    pub image_extensions: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            parallel_workers: cpus.min(8),
            progress: true,
            image_extensions: vec![
                "png".to_string(),
                "jpg".to_string(),
                "jpeg".to_string(),
                "bmp".to_string(),
                "webp".to_string(),
            ],
        }
    }
}

/// Which object store receives images before description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StoreKind {
    /// Inline the image as a base64 `data:` URL (no network)
    #[default]
    DataUrl,
    /// HTTP PUT to an object store endpoint
    HttpPut,
}

/// Upload settings: store selection and the payload budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Store implementation
    pub store: StoreKind,

    /// PUT endpoint (bucket URL) for `http-put`
    pub endpoint: String,

    /// Public URL prefix for uploaded objects; defaults to `endpoint`
    pub public_base: String,

    /// Bearer token for `http-put` (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Pixel-count budget (width * height)
    pub max_pixels: u64,

    /// Byte-size budget
    pub max_bytes: u64,

    /// First JPEG quality tried when re-encoding
    pub start_quality: u8,

    /// Quality decrement per attempt
    pub quality_step: u8,

    /// Lowest quality tried
    pub min_quality: u8,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::DataUrl,
            endpoint: String::new(),
            public_base: String::new(),
            api_key: "${REFRACT_STORE_TOKEN}".to_string(),
            max_pixels: 40_000_000,
            max_bytes: 10 * 1024 * 1024,
            start_quality: 95,
            quality_step: 5,
            min_quality: 50,
        }
    }
}

/// Vision-to-text service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DescribeConfig {
    /// OpenAI-compatible API base URL
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Prompt sent with every image
    pub prompt: String,
}

impl Default for DescribeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ark.cn-beijing.volces.com/api/v3".to_string(),
            api_key: "${ARK_API_KEY}".to_string(),
            model: "doubao-1-5-vision-pro-32k-250115".to_string(),
            prompt: "What is this image mainly about? Write a detailed prompt that could be \
                     used to generate it, formatted as art style followed by subject \
                     description. For example:\nArt style: realistic photography with a \
                     vintage warm-brown grade and visible film grain, natural and \
                     understated.\nSubject: a brown deer with dark markings stands on open \
                     ground, head turned aside, ears raised, with thick curved antlers; dry \
                     branches and small stones are scattered around and low green shrubs \
                     fill the distance."
                .to_string(),
        }
    }
}

/// How the text-to-image stage picks its target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SizeMode {
    /// Always use the fixed configured size
    #[default]
    Fixed,
    /// Derive from the sibling metadata record, normalized to service limits
    #[serde(alias = "match_metadata")]
    Metadata,
}

/// Text-to-image service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// OpenAI-compatible API base URL
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Size selection mode
    pub size_mode: SizeMode,

    /// Named size token (e.g. "2K"); takes precedence over width/height when set
    pub fixed_size: String,

    /// Fixed output width
    pub width: u32,

    /// Fixed output height
    pub height: u32,

    /// Sequential generation mode sent to the service
    pub sequential_mode: String,

    /// Max simultaneously generated variants
    pub max_images: u32,

    /// Ask the service to watermark results
    pub watermark: bool,

    /// Side limits accepted by the service
    pub limits: SizeLimits,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ark.cn-beijing.volces.com/api/v3".to_string(),
            api_key: "${ARK_API_KEY}".to_string(),
            model: "doubao-seedream-4-0-250828".to_string(),
            size_mode: SizeMode::Fixed,
            fixed_size: "2K".to_string(),
            width: 1920,
            height: 1080,
            sequential_mode: "auto".to_string(),
            max_images: 1,
            watermark: false,
            limits: SizeLimits::default(),
        }
    }
}

impl GenerationConfig {
    /// The size used in fixed mode and whenever metadata cannot be used.
    pub fn fallback_size(&self) -> GenerationSize {
        let token = self.fixed_size.trim();
        if token.is_empty() {
            GenerationSize::Pixels {
                width: self.width,
                height: self.height,
            }
        } else {
            GenerationSize::Named(token.to_string())
        }
    }
}

/// Fixed-attempt retry for collaborator calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub attempts: u32,

    /// Fixed delay between attempts in milliseconds
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay_ms: 1500,
        }
    }
}

/// Resource limits for collaborator calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Per-request timeout for upload/describe/generate calls in milliseconds
    pub request_timeout_ms: u64,

    /// Timeout for downloading a generated image in milliseconds
    pub download_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 120_000,
            download_timeout_ms: 60_000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
