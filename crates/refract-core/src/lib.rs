//! Refract Core - idempotent batch transformation of image trees.
//!
//! Refract walks a source tree of images and produces three mirrored trees:
//! per-image metadata records, text descriptions written by a vision model,
//! and images regenerated from those descriptions. Every stage skips items
//! whose outputs already exist, so an interrupted run can simply be started
//! again.
//!
//! ```text
//! source/ ──metadata──▶ meta/*.json ──index──▶ meta/all_metadata.json
//!    │
//!    └────describe────▶ text/*.txt ──render──▶ output/*.jpg ──prefix──▶ output/F_*.jpg
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use refract_core::{Config, Refract};
//!
//! #[tokio::main]
//! async fn main() -> refract_core::Result<()> {
//!     let refract = Refract::new(Config::load()?)?;
//!     for report in refract.run_pipeline().await {
//!         println!("{}: {} processed", report.stage, report.processed());
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod clients;
pub mod codec;
pub mod collector;
pub mod config;
pub mod error;
pub mod executor;
pub mod output;
pub mod progress;
pub mod retry;
pub mod sizing;
pub mod stages;
pub mod types;

use std::sync::Arc;

// Re-exports for convenient access
pub use clients::{ClientFactory, HttpClientFactory};
pub use codec::ImageCodec;
pub use config::{Config, SizeMode};
pub use error::{ConfigError, RefractError, Result, TaskError, TaskResult};
pub use executor::{RunReport, TaskExecutor};
pub use progress::{LogProgress, ProgressSink, ProgressTicker, SilentProgress};
pub use sizing::{normalize, Dimensions, GenerationSize, SizeLimits};
pub use stages::{IndexReport, PrefixReport, StageContext, StageReport, FINAL_PREFIX, INDEX_FILE_NAME};
pub use types::{MetadataRecord, Outcome, Stage, TaskItem};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Refract processor - the main entry point.
///
/// Holds the frozen configuration and the collaborators shared by every
/// stage. Each stage call is independent and can be re-run at any time.
pub struct Refract {
    config: Arc<Config>,
    clients: Arc<dyn ClientFactory>,
    codec: Arc<dyn ImageCodec>,
    progress: Arc<dyn ProgressSink>,
}

impl Refract {
    /// Validate and freeze `config`, wiring the HTTP collaborators and the
    /// best available image codec.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        tracing::debug!("Initializing Refract v{}", VERSION);

        let codec = codec::detect();
        tracing::debug!("Image codec: {}", codec.name());

        Ok(Self {
            clients: Arc::new(HttpClientFactory::new(config.clone())),
            config,
            codec,
            progress: Arc::new(LogProgress),
        })
    }

    /// Replace the collaborator factory.
    pub fn with_clients(mut self, clients: Arc<dyn ClientFactory>) -> Self {
        self.clients = clients;
        self
    }

    /// Replace the progress display.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Replace the image codec.
    pub fn with_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn context(&self) -> StageContext {
        StageContext {
            config: self.config.clone(),
            clients: self.clients.clone(),
            codec: self.codec.clone(),
            executor: TaskExecutor::new(self.config.processing.parallel_workers)
                .with_progress(self.progress.clone()),
        }
    }

    /// Images -> Metadata, followed by a full index rebuild.
    pub async fn generate_metadata(&self) -> StageReport {
        let mut report = stages::metadata::run(&self.context()).await;
        if report.root_missing {
            return report;
        }
        match self.build_index().await {
            Ok(index) => report.index = index,
            Err(e) => tracing::error!("Failed to write metadata index: {e}"),
        }
        report
    }

    /// Images -> Text.
    pub async fn generate_text(&self) -> StageReport {
        stages::describe::run(&self.context()).await
    }

    /// Text -> Images.
    pub async fn generate_images(&self) -> StageReport {
        stages::render::run(&self.context()).await
    }

    /// Rebuild `all_metadata.json` from the records currently on disk.
    pub async fn build_index(&self) -> Result<Option<IndexReport>> {
        let root = self.config.metadata_dir();
        tokio::task::spawn_blocking(move || stages::index::build_index(&root))
            .await
            .map_err(|e| RefractError::Io(std::io::Error::other(e)))?
    }

    /// Add the finalized prefix to every generated image.
    pub async fn prefix_outputs(&self) -> PrefixReport {
        let root = self.config.output_dir();
        let extensions = self.config.processing.image_extensions.clone();
        match tokio::task::spawn_blocking(move || stages::prefix::prefix_outputs(&root, &extensions))
            .await
        {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Prefixing task failed: {e}");
                PrefixReport::default()
            }
        }
    }

    /// Metadata, then text, then images. Each stage runs regardless of how
    /// the previous one went.
    pub async fn run_pipeline(&self) -> Vec<StageReport> {
        let mut reports = Vec::with_capacity(3);
        reports.push(self.generate_metadata().await);
        reports.push(self.generate_text().await);
        reports.push(self.generate_images().await);
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::mock::{write_text, MockFactory, MockStats};

    fn refract_in(root: &std::path::Path, stats: Arc<MockStats>) -> Refract {
        let mut config = Config::default();
        config.paths.source = root.join("real");
        config.paths.text = root.join("text");
        config.paths.output = root.join("output");
        config.paths.metadata = root.join("meta");
        config.processing.parallel_workers = 2;
        config.retry.delay_ms = 1;
        Refract::new(config)
            .unwrap()
            .with_clients(Arc::new(MockFactory { stats }))
            .with_progress(Arc::new(SilentProgress))
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = Config::default();
        config.processing.parallel_workers = 0;
        assert!(matches!(Refract::new(config), Err(RefractError::Config(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pipeline_continues_past_missing_roots() {
        let dir = tempfile::tempdir().unwrap();
        let stats = Arc::new(MockStats::default());
        let refract = refract_in(dir.path(), stats.clone());
        write_text(&dir.path().join("text/a.txt"), "a prompt");

        let reports = refract.run_pipeline().await;
        assert_eq!(reports.len(), 3);
        assert!(reports[0].root_missing);
        assert!(reports[0].index.is_none());
        assert!(reports[1].root_missing);
        assert_eq!(reports[2].stage, Stage::Render);
        assert_eq!(reports[2].processed(), 1);
        assert!(dir.path().join("output/a.jpg").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_prefix_then_render_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let stats = Arc::new(MockStats::default());
        let refract = refract_in(dir.path(), stats.clone());
        write_text(&dir.path().join("text/a.txt"), "a prompt");

        refract.generate_images().await;
        let prefixed = refract.prefix_outputs().await;
        assert_eq!(prefixed.renamed, 1);
        assert!(dir.path().join("output/F_a.jpg").exists());

        let again = refract.generate_images().await;
        assert_eq!(again.run.total, 0);
        assert_eq!(again.skipped, 1);
    }

    #[cfg(feature = "codec")]
    #[tokio::test(flavor = "multi_thread")]
    async fn test_full_pipeline_with_index() {
        use crate::stages::mock::write_png;

        let dir = tempfile::tempdir().unwrap();
        let stats = Arc::new(MockStats::default());
        let refract = refract_in(dir.path(), stats.clone());
        write_png(&dir.path().join("real/a.png"), 16, 12);
        write_png(&dir.path().join("real/park/b.png"), 12, 16);

        let reports = refract.run_pipeline().await;
        assert!(reports.iter().all(|r| r.is_success()));
        assert!(reports.iter().all(|r| r.processed() == 2));

        let index = reports[0].index.as_ref().unwrap();
        assert_eq!(index.entries, 2);
        assert!(dir.path().join("meta").join(INDEX_FILE_NAME).exists());
        assert!(dir.path().join("text/park/b.txt").exists());
        assert!(dir.path().join("output/park/b.jpg").exists());
    }
}
