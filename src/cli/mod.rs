//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;
mod bump;
mod serve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::{find_config, load_config, merge_cli_overrides, CliOverrides};
use crate::pipeline::PipelineContext;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// Sitesmith - asset pipeline and dev server for static front-end projects
#[derive(Parser)]
#[command(name = "sitesmith")]
#[command(about = "Sitesmith - build, watch, and serve static front-end projects")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Produce more output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Path to sitesmith.toml (default: walk up from the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full build pipeline into the build directory
    Build {
        /// Stop scheduling tasks after the first failure
        #[arg(long)]
        fail_fast: bool,

        /// Number of parallel workers (default: available cores)
        #[arg(long)]
        jobs: Option<usize>,

        /// Resolve and print the task plan without running actions
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a single registry task (and its dependencies)
    Run {
        /// Task name, e.g. styles, images, optimize
        task: String,

        /// Stop scheduling tasks after the first failure
        #[arg(long)]
        fail_fast: bool,

        /// Number of parallel workers (default: available cores)
        #[arg(long)]
        jobs: Option<usize>,
    },

    /// Serve the project over HTTP with live reload
    Serve {
        /// Serve the source tree (dev) or the finished build (build)
        #[arg(long, value_enum, default_value = "dev")]
        env: crate::serve::ServeEnv,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,

        /// Disable live-reload notifications
        #[arg(long)]
        no_reload: bool,
    },

    /// Remove the build and temp directories
    Clean,

    /// Bump the project version in sitesmith.toml
    Bump {
        /// Which part of the version to bump
        #[arg(long, value_enum, default_value = "patch")]
        kind: crate::bump::BumpKind,

        /// Set an explicit version instead of bumping
        #[arg(long, value_name = "VERSION")]
        set: Option<String>,
    },

    /// List the registry tasks and their dependencies
    Tasks,
}

/// Run the CLI.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { fail_fast, jobs, dry_run } => build::run_build(
            cli.config.as_deref(),
            cli.verbose,
            fail_fast,
            jobs,
            dry_run,
        ),
        Commands::Run { ref task, fail_fast, jobs } => {
            build::run_task(cli.config.as_deref(), cli.verbose, task, fail_fast, jobs)
        }
        Commands::Serve { env, port, no_reload } => {
            serve::run_serve(cli.config.as_deref(), cli.verbose, env, port, no_reload)
        }
        Commands::Clean => build::run_clean(cli.config.as_deref(), cli.verbose),
        Commands::Bump { kind, ref set } => {
            bump::run_bump(cli.config.as_deref(), kind, set.as_deref())
        }
        Commands::Tasks => build::run_tasks(),
    }
}

/// Load config and build the pipeline context shared by all commands.
///
/// Configuration problems are fatal here, before any task executes.
pub(crate) fn load_context(
    config_path: Option<&std::path::Path>,
    verbose: bool,
    overrides: CliOverrides,
) -> Result<PipelineContext, String> {
    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config().ok_or_else(|| {
            "No sitesmith.toml found in this directory or any parent".to_string()
        })?,
    };

    if verbose {
        println!("Using config: {}", config_path.display());
    }

    let mut config =
        load_config(Some(&config_path)).map_err(|e| format!("Error loading config: {}", e))?;
    merge_cli_overrides(&mut config, &overrides);

    let project_root = config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    Ok(PipelineContext::new(config, project_root).with_verbose(verbose))
}
