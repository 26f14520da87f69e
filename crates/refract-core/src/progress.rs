//! Progress reporting seam.
//!
//! The executor only knows these traits. The CLI plugs in a terminal bar;
//! the library ships a log-only fallback and a silent one.

/// Creates one ticker per stage run.
pub trait ProgressSink: Send + Sync {
    fn start(&self, label: &str, total: usize) -> Box<dyn ProgressTicker>;
}

/// Advanced once per completed outcome, in completion order.
pub trait ProgressTicker: Send {
    fn tick(&mut self, success: bool);
    fn finish(&mut self);
}

/// Announces totals and completion through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn start(&self, label: &str, total: usize) -> Box<dyn ProgressTicker> {
        tracing::info!("{label} - total tasks: {total}");
        Box::new(LogTicker {
            label: label.to_string(),
            total,
            done: 0,
        })
    }
}

struct LogTicker {
    label: String,
    total: usize,
    done: usize,
}

impl ProgressTicker for LogTicker {
    fn tick(&mut self, success: bool) {
        self.done += 1;
        tracing::debug!(
            "{} {}/{} (success={success})",
            self.label,
            self.done,
            self.total
        );
    }

    fn finish(&mut self) {
        tracing::debug!("{} finished", self.label);
    }
}

/// Reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn start(&self, _label: &str, _total: usize) -> Box<dyn ProgressTicker> {
        Box::new(SilentTicker)
    }
}

struct SilentTicker;

impl ProgressTicker for SilentTicker {
    fn tick(&mut self, _success: bool) {}
    fn finish(&mut self) {}
}
