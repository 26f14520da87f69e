//! Error types for Refract.
//!
//! `TaskError` is the per-item taxonomy: every fault raised while processing a
//! single task item is one of its variants, and the executor turns it into a
//! failing outcome instead of letting it escape. `RefractError` covers the
//! faults that are allowed to stop a whole action (configuration, index I/O).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Refract operations.
#[derive(Error, Debug)]
pub enum RefractError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A single task-level fault surfaced outside the executor
    #[error(transparent)]
    Task(#[from] TaskError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Faults raised while processing one task item.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Metadata dimensions were zero or negative
    #[error("Invalid dimensions {width}x{height}: width and height must be positive")]
    InvalidDimensions { width: i64, height: i64 },

    /// The source file could not be read or decoded
    #[error("Cannot read {path}: {message}")]
    UnreadableSource { path: PathBuf, message: String },

    /// An upload, description, generation or download call failed
    #[error("{service} error: {message}")]
    Collaborator {
        service: String,
        message: String,
        status_code: Option<u16>,
    },

    /// A text prompt file exists but holds no text
    #[error("Text prompt is empty: {0}")]
    EmptyInput(PathBuf),

    /// An output directory or file could not be created or written
    #[error("Cannot write {path}: {message}")]
    WriteFailure { path: PathBuf, message: String },

    /// A rename target already exists
    #[error("Target already exists for {path}: {target}")]
    Collision { path: PathBuf, target: PathBuf },
}

impl TaskError {
    /// Build a collaborator error without an HTTP status.
    pub fn collaborator(service: &str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            service: service.to_string(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Map a transport-level `reqwest` failure, keeping timeouts and connect
    /// errors recognizable to the retry classifier.
    pub fn from_transport(service: &str, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connect failed"
        } else {
            "request failed"
        };
        Self::Collaborator {
            service: service.to_string(),
            message: format!("{kind}: {err}"),
            status_code: err.status().map(|s| s.as_u16()),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::WriteFailure {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::UnreadableSource {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Convenience type alias for Refract results.
pub type Result<T> = std::result::Result<T, RefractError>;

/// Convenience type alias for task-level results.
pub type TaskResult<T> = std::result::Result<T, TaskError>;
