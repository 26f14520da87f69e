//! Stage processors.
//!
//! Each stage pairs a naming rule for the collector with a [`TaskHandler`]
//! for the executor. The shared [`run_stage`] driver handles the missing-root
//! case, collection and execution so the stage modules only describe what is
//! specific to them.

pub mod describe;
pub mod index;
pub mod metadata;
pub mod prefix;
pub mod render;

#[cfg(test)]
pub(crate) mod mock;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::clients::ClientFactory;
use crate::codec::ImageCodec;
use crate::collector::{SourceEntry, TaskCollector};
use crate::config::Config;
use crate::error::TaskError;
use crate::executor::{RunReport, TaskExecutor, TaskHandler};
use crate::types::{Stage, TaskItem};

pub use index::{IndexReport, INDEX_FILE_NAME};
pub use prefix::{PrefixReport, FINAL_PREFIX};

/// Everything a stage needs, built once per run.
#[derive(Clone)]
pub struct StageContext {
    pub config: Arc<Config>,
    pub clients: Arc<dyn ClientFactory>,
    pub codec: Arc<dyn ImageCodec>,
    pub executor: TaskExecutor,
}

/// Result of one stage run.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    pub root: PathBuf,
    /// The input root did not exist; nothing was attempted
    pub root_missing: bool,
    /// Items whose outputs already existed
    pub skipped: usize,
    pub run: RunReport,
    /// Index rebuilt after the metadata stage
    pub index: Option<IndexReport>,
}

impl StageReport {
    fn missing(stage: Stage, root: &Path) -> Self {
        Self {
            stage,
            root: root.to_path_buf(),
            root_missing: true,
            skipped: 0,
            run: RunReport {
                label: stage.label().to_string(),
                total: 0,
                succeeded: 0,
                failures: Vec::new(),
                elapsed: std::time::Duration::ZERO,
            },
            index: None,
        }
    }

    pub fn processed(&self) -> usize {
        self.run.succeeded
    }

    pub fn failed(&self) -> usize {
        self.run.failed()
    }

    pub fn is_success(&self) -> bool {
        !self.root_missing && self.run.is_success()
    }
}

/// Collect pending items under `root` and run them through `handler`.
pub(crate) async fn run_stage<H, F>(
    ctx: &StageContext,
    stage: Stage,
    root: &Path,
    extensions: &[String],
    overwrite: bool,
    naming: F,
    handler: H,
) -> StageReport
where
    H: TaskHandler,
    F: Fn(&SourceEntry) -> TaskItem,
{
    if !root.is_dir() {
        tracing::warn!("Directory does not exist: {}", root.display());
        return StageReport::missing(stage, root);
    }

    let collection = TaskCollector::new(extensions).collect(root, overwrite, naming);
    tracing::info!(
        "{}: {} pending, {} already done",
        stage.label(),
        collection.items.len(),
        collection.skipped
    );

    let run = ctx
        .executor
        .run(stage.label(), collection.items, Arc::new(handler))
        .await;

    StageReport {
        stage,
        root: root.to_path_buf(),
        root_missing: false,
        skipped: collection.skipped,
        run,
        index: None,
    }
}

/// Run blocking codec work off the async workers.
pub(crate) async fn blocking<T, F>(path: &Path, work: F) -> crate::error::TaskResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> crate::error::TaskResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| TaskError::unreadable(path, format!("codec task failed: {e}")))?
}
