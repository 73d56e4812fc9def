//! filetreesubs: keep a destination tree in sync with a source tree,
//! substituting configured text on the way.
//!
//! # Usage
//!
//! ```text
//! filetreesubs [CONFIG] [--dry-run]
//! ```
//!
//! `CONFIG` defaults to `filetreesubs-config.yaml` in the working directory.
//! Set `RUST_LOG=info` (or `debug`) for per-file logging.

mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use filetreesubs_core::{types::DEFAULT_CONFIG_FILENAME, Config};
use filetreesubs_sync::pipeline;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "filetreesubs",
    version,
    about = "Synchronize a file tree, substituting text in matching files",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(default_value = DEFAULT_CONFIG_FILENAME)]
    config: PathBuf,

    /// Show which tasks would run without changing any files.
    #[arg(long)]
    dry_run: bool,
}

fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("warn");
    let _ = env_logger::Builder::from_env(env)
        .format_target(false)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = Config::load(&cli.config)
        .with_context(|| format!("could not load {}", cli.config.display()))?;
    tracing::debug!(
        "syncing {} -> {}",
        config.source.display(),
        config.destination.display()
    );

    let result = pipeline::run(&config, cli.dry_run).with_context(|| {
        format!(
            "sync of {} into {} failed",
            config.source.display(),
            config.destination.display()
        )
    })?;
    report::print_results(&result, cli.dry_run);
    Ok(())
}
