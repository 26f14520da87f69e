//! CLI command implementations.

pub mod config;
pub mod interactive;
pub mod progress;
pub mod run;
pub mod summary;
