//! Configuration management for Refract.
//!
//! Configuration is loaded once per run from `config.toml` (platform config
//! dir, or `--config`), then frozen behind an `Arc` and handed to every
//! component. Nothing mutates it after startup.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Refract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directories
    pub paths: PathsConfig,

    /// Regeneration overrides
    pub overwrite: OverwriteConfig,

    /// Processing settings
    pub processing: ProcessingConfig,

    /// Upload store and payload budgets
    pub upload: UploadConfig,

    /// Image-to-text service
    pub describe: DescribeConfig,

    /// Text-to-image service
    pub generation: GenerationConfig,

    /// Collaborator retry policy
    pub retry: RetryConfig,

    /// Request timeouts
    pub limits: LimitsConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/rs.refract.refract/config.toml
    /// - Linux: ~/.config/refract/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\refract\config\config.toml
    ///
    /// Falls back to ~/.refract/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("rs", "refract", "refract")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".refract").join("config.toml")
            })
    }

    /// Source image root (with ~ expansion).
    pub fn source_dir(&self) -> PathBuf {
        expand(&self.paths.source)
    }

    /// Text description root (with ~ expansion).
    pub fn text_dir(&self) -> PathBuf {
        expand(&self.paths.text)
    }

    /// Generated image root (with ~ expansion).
    pub fn output_dir(&self) -> PathBuf {
        expand(&self.paths.output)
    }

    /// Metadata root (with ~ expansion).
    pub fn metadata_dir(&self) -> PathBuf {
        expand(&self.paths.metadata)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}

/// Resolve `${ENV_VAR}` references in config strings.
///
/// Plain values pass through; empty values and unset variables yield `None`.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
