//! Bounded-concurrency task execution with per-item failure isolation.
//!
//! The executor starts at most `workers` tokio tasks that pull items from a
//! shared queue. Each worker lazily builds its own resource set (collaborator
//! clients) on first use and keeps it for every later item it takes; handles
//! are never shared between workers. Every item yields exactly one
//! [`Outcome`]: handler errors and panics are converted at this boundary and
//! never reach sibling items. Outcomes flow back over a channel to a single
//! draining loop that ticks progress and collects failures, so workers never
//! touch shared counters.

use async_trait::async_trait;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::error::TaskResult;
use crate::progress::{LogProgress, ProgressSink};
use crate::types::{Outcome, TaskItem};

/// Per-item worker body for one stage.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    /// State owned by exactly one worker (e.g. HTTP clients).
    type Resources: Send + 'static;

    /// Build a fresh resource set. Called at most once per worker, plus once
    /// more after a panic discards the previous set.
    fn create_resources(&self) -> TaskResult<Self::Resources>;

    /// Process one item and return the path written.
    async fn handle(&self, item: &TaskItem, resources: &mut Self::Resources)
        -> TaskResult<PathBuf>;
}

/// Aggregate result of one executor run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub label: String,
    pub total: usize,
    pub succeeded: usize,
    /// Every failing outcome, in completion order
    pub failures: Vec<Outcome>,
    pub elapsed: Duration,
}

impl RunReport {
    fn empty(label: &str) -> Self {
        Self {
            label: label.to_string(),
            total: 0,
            succeeded: 0,
            failures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when no item failed (including the empty run).
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs homogeneous task batches on a bounded worker pool.
#[derive(Clone)]
pub struct TaskExecutor {
    workers: usize,
    progress: Arc<dyn ProgressSink>,
}

impl TaskExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            progress: Arc::new(LogProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every item through `handler` and fold the outcomes into a report.
    ///
    /// Never fails: an empty batch is a no-op, and individual failures are
    /// listed in the report rather than aborting the run.
    pub async fn run<H: TaskHandler>(
        &self,
        label: &str,
        items: Vec<TaskItem>,
        handler: Arc<H>,
    ) -> RunReport {
        if items.is_empty() {
            tracing::info!("No pending tasks for {label}.");
            return RunReport::empty(label);
        }

        let start = Instant::now();
        let total = items.len();
        let queue = Arc::new(Mutex::new(items.into_iter()));
        let (tx, mut rx) = mpsc::unbounded_channel::<Outcome>();

        let mut handles = Vec::with_capacity(self.workers.min(total));
        for worker_id in 0..self.workers.min(total) {
            let queue = queue.clone();
            let handler = handler.clone();
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                let mut resources: Option<H::Resources> = None;
                while let Some(item) = next_item(&queue) {
                    let outcome = run_one(handler.as_ref(), &item, &mut resources).await;
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
                tracing::trace!("Worker {worker_id} drained");
            }));
        }
        drop(tx);

        let mut ticker = self.progress.start(label, total);
        let mut succeeded = 0usize;
        let mut failures = Vec::new();
        while let Some(outcome) = rx.recv().await {
            ticker.tick(outcome.success);
            if outcome.success {
                succeeded += 1;
            } else {
                failures.push(outcome);
            }
        }
        ticker.finish();

        // A worker that died outside the item boundary took its item with it.
        let missing = total.saturating_sub(succeeded + failures.len());
        if missing > 0 {
            tracing::error!("{missing} {label} task(s) produced no outcome");
            failures.extend((0..missing).map(|_| {
                Outcome::failed(
                    std::path::Path::new(label),
                    "worker exited before reporting this item",
                )
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker for {label} terminated abnormally: {e}");
            }
        }

        let report = RunReport {
            label: label.to_string(),
            total,
            succeeded,
            failures,
            elapsed: start.elapsed(),
        };
        log_report(&report);
        report
    }
}

fn next_item(queue: &Mutex<std::vec::IntoIter<TaskItem>>) -> Option<TaskItem> {
    let mut guard = match queue.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.next()
}

/// The worker boundary: every error or panic becomes a failing outcome.
async fn run_one<H: TaskHandler>(
    handler: &H,
    item: &TaskItem,
    resources: &mut Option<H::Resources>,
) -> Outcome {
    if resources.is_none() {
        match std::panic::catch_unwind(AssertUnwindSafe(|| handler.create_resources())) {
            Ok(Ok(res)) => *resources = Some(res),
            Ok(Err(e)) => return Outcome::failed(&item.input, e.to_string()),
            Err(panic) => {
                return Outcome::failed(
                    &item.input,
                    format!("worker setup panicked: {}", panic_message(&*panic)),
                )
            }
        }
    }
    let Some(res) = resources.as_mut() else {
        return Outcome::failed(&item.input, "worker resources unavailable");
    };

    match AssertUnwindSafe(handler.handle(item, res))
        .catch_unwind()
        .await
    {
        Ok(Ok(written)) => Outcome::succeeded(&written),
        Ok(Err(e)) => Outcome::failed(&item.input, e.to_string()),
        Err(panic) => {
            // The handle may be mid-request; rebuild it for the next item.
            *resources = None;
            Outcome::failed(&item.input, format!("worker panicked: {}", panic_message(&*panic)))
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_report(report: &RunReport) {
    if report.is_success() {
        tracing::info!(
            "All {} tasks completed successfully ({} in {:.1}s).",
            report.label,
            report.succeeded,
            report.elapsed.as_secs_f64()
        );
        return;
    }

    tracing::warn!(
        "{} task(s) failed during {}:",
        report.failed(),
        report.label
    );
    for failure in &report.failures {
        tracing::warn!(
            " - {}: {}",
            failure.identifier,
            failure.message.as_deref().unwrap_or("unknown error")
        );
    }
}
