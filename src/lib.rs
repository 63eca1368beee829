// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod globs;
pub mod logging;
pub mod pipeline;
pub mod project;
pub mod reload;
pub mod report;
pub mod serve;
pub mod types;
pub mod watch;

use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::cli::{CliArgs, Command};
use crate::project::Project;

/// High-level entry point used by `main.rs`.
///
/// Loads the project (or the built-in pipeline) and dispatches the command:
/// - `build` / `clean` return their failure, so the process exits non-zero
/// - `watch`, `serve` and `default` run until Ctrl-C
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let project = Project::load(&config_path, args.port)?;

    if args.dry_run {
        print!("{}", project.describe()?);
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    match args.command() {
        Command::Build => project.build().await?,
        Command::Clean => project.clean()?,
        Command::Watch => project.watch(None).await?,
        Command::Serve => project.serve().await?,
        Command::Default => project.develop().await?,
    }
    Ok(())
}
