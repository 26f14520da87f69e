//! Refract CLI - re-runnable batch pipeline over image trees.
//!
//! Refract turns a tree of source images into metadata records, text
//! descriptions and regenerated images, each in its own mirrored tree.
//! Every action skips work whose output already exists.
//!
//! # Usage
//!
//! ```bash
//! # Record image dimensions and rebuild the metadata index
//! refract metadata
//!
//! # Describe every image, then regenerate images sized from metadata
//! refract describe --parallel 8
//! refract render --size-mode metadata
//!
//! # Everything in order
//! refract pipeline
//!
//! # View configuration
//! refract config show
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

mod cli;
mod logging;

use cli::run::{Action, RunArgs};
use refract_core::Config;

/// Refract - images to metadata, images to text, text to images.
#[derive(Parser, Debug)]
#[command(name = "refract")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "REFRACT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Images -> Metadata: record dimensions and rebuild all_metadata.json
    Metadata(RunArgs),

    /// Images -> Text: describe every source image
    Describe(RunArgs),

    /// Text -> Images: generate an image from every description
    Render(RunArgs),

    /// Add the F_ prefix to generated images
    Prefix,

    /// Rebuild all_metadata.json from the records on disk
    Index,

    /// Run metadata, describe and render in sequence
    Pipeline(RunArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config problems go through eprintln.
    let config = load_config(cli.config.as_deref())?;
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Refract v{}", refract_core::VERSION);

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let no_args = RunArgs::default();

    match cli.command {
        Some(Commands::Metadata(args)) => cli::run::execute(Action::Metadata, &args, config).await,
        Some(Commands::Describe(args)) => cli::run::execute(Action::Describe, &args, config).await,
        Some(Commands::Render(args)) => cli::run::execute(Action::Render, &args, config).await,
        Some(Commands::Prefix) => cli::run::execute(Action::Prefix, &no_args, config).await,
        Some(Commands::Index) => cli::run::execute(Action::Index, &no_args, config).await,
        Some(Commands::Pipeline(args)) => cli::run::execute(Action::Pipeline, &args, config).await,
        Some(Commands::Config(args)) => cli::config::execute(args, &config, &config_path).await,
        None => {
            if console::Term::stderr().is_term() && console::Term::stdout().is_term() {
                cli::interactive::run(&config).await
            } else {
                Cli::command().print_help()?;
                Ok(())
            }
        }
    }
}

/// An explicit `--config` must load; the default location falls back to
/// built-in defaults with a warning.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        return Config::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()));
    }

    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `refract config path`."
            );
            Ok(Config::default())
        }
    }
}
