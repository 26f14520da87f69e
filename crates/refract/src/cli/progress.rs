//! Terminal progress bar for stage runs.

use indicatif::{ProgressBar, ProgressStyle};
use refract_core::{ProgressSink, ProgressTicker};

/// One indicatif bar per stage run.
pub struct BarProgress;

impl ProgressSink for BarProgress {
    fn start(&self, label: &str, total: usize) -> Box<dyn ProgressTicker> {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        ) {
            pb.set_style(style.progress_chars("##-"));
        }
        pb.set_message(label.to_string());
        Box::new(BarTicker {
            pb,
            label: label.to_string(),
            failed: 0,
        })
    }
}

struct BarTicker {
    pb: ProgressBar,
    label: String,
    failed: usize,
}

impl ProgressTicker for BarTicker {
    fn tick(&mut self, success: bool) {
        if !success {
            self.failed += 1;
            self.pb
                .set_message(format!("{} ({} failed)", self.label, self.failed));
        }
        self.pb.inc(1);
    }

    fn finish(&mut self) {
        self.pb.finish();
    }
}
