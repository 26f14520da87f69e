//! Stage commands: `metadata`, `describe`, `render`, `prefix`, `index`,
//! `pipeline`.

use clap::{Args, ValueEnum};
use refract_core::{Config, Refract, SizeMode};
use std::sync::Arc;

use super::progress::BarProgress;
use super::summary;

/// The selectable actions, shared by subcommands and the interactive menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Metadata,
    Describe,
    Render,
    Prefix,
    Index,
    Pipeline,
}

impl Action {
    pub fn description(&self) -> &'static str {
        match self {
            Action::Metadata => "Generate metadata from images",
            Action::Describe => "Generate text from images",
            Action::Render => "Generate images from text",
            Action::Prefix => "Prefix output images with F_",
            Action::Index => "Rebuild the metadata index",
            Action::Pipeline => "Run the full pipeline (metadata -> text -> images)",
        }
    }

    /// Whether `--overwrite` means anything for this action.
    pub fn writes_stage_outputs(&self) -> bool {
        matches!(
            self,
            Action::Metadata | Action::Describe | Action::Render | Action::Pipeline
        )
    }
}

/// Target size policy for generated images.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SizeModeArg {
    /// Always request the configured fixed size
    Fixed,
    /// Derive the size from each image's metadata record
    Metadata,
}

impl From<SizeModeArg> for SizeMode {
    fn from(arg: SizeModeArg) -> Self {
        match arg {
            SizeModeArg::Fixed => SizeMode::Fixed,
            SizeModeArg::Metadata => SizeMode::Metadata,
        }
    }
}

/// Flags shared by the stage commands.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Number of parallel workers (overrides processing.parallel_workers)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Regenerate outputs that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// How generated images are sized
    #[arg(long, value_enum)]
    pub size_mode: Option<SizeModeArg>,
}

impl RunArgs {
    /// Fold the flags into the loaded configuration before it is frozen.
    pub fn apply(&self, config: &mut Config, action: Action) {
        if let Some(parallel) = self.parallel {
            config.processing.parallel_workers = parallel;
        }
        if self.no_progress {
            config.processing.progress = false;
        }
        if let Some(mode) = self.size_mode {
            config.generation.size_mode = mode.into();
        }
        if self.overwrite {
            let overwrite = &mut config.overwrite;
            match action {
                Action::Metadata => overwrite.metadata = true,
                Action::Describe => overwrite.text = true,
                Action::Render => overwrite.images = true,
                Action::Pipeline => {
                    overwrite.metadata = true;
                    overwrite.text = true;
                    overwrite.images = true;
                }
                Action::Prefix | Action::Index => {}
            }
        }
    }
}

/// Execute an action from the command line. Fails when any item failed; a
/// missing root is reported but is not a failure.
pub async fn execute(action: Action, args: &RunArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply(&mut config, action);
    if !perform(action, config).await? {
        anyhow::bail!("{} finished with failures", action.description());
    }
    Ok(())
}

/// Run `action`, print its summary and report whether every item succeeded.
pub async fn perform(action: Action, config: Config) -> anyhow::Result<bool> {
    let show_progress = config.processing.progress && console::Term::stderr().is_term();
    let mut refract = Refract::new(config)?;
    if show_progress {
        refract = refract.with_progress(Arc::new(BarProgress));
    }

    let success = match action {
        Action::Metadata => {
            let report = refract.generate_metadata().await;
            summary::print_stages(std::slice::from_ref(&report));
            report.failed() == 0
        }
        Action::Describe => {
            let report = refract.generate_text().await;
            summary::print_stages(std::slice::from_ref(&report));
            report.failed() == 0
        }
        Action::Render => {
            let report = refract.generate_images().await;
            summary::print_stages(std::slice::from_ref(&report));
            report.failed() == 0
        }
        Action::Pipeline => {
            let reports = refract.run_pipeline().await;
            summary::print_stages(&reports);
            reports.iter().all(|r| r.failed() == 0)
        }
        Action::Prefix => {
            let report = refract.prefix_outputs().await;
            summary::print_prefix(&report);
            true
        }
        Action::Index => {
            match refract.build_index().await? {
                Some(report) => summary::print_index(&report),
                None => eprintln!("\n  Metadata directory does not exist; no index written."),
            }
            true
        }
    };
    Ok(success)
}
