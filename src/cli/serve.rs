//! Serve command implementation

use std::path::Path;
use std::process::ExitCode;

use super::{load_context, EXIT_ERROR, EXIT_SUCCESS};
use crate::config::CliOverrides;
use crate::pipeline::{registry, ParallelExecutor};
use crate::serve::{serve, ServeEnv, ServeOptions};

/// Run the serve command.
///
/// Dev mode renders the templates first and then serves the source tree
/// with watchers; build mode runs the full build and serves the result.
pub fn run_serve(
    config: Option<&Path>,
    verbose: bool,
    env: ServeEnv,
    port: Option<u16>,
    no_reload: bool,
) -> ExitCode {
    let overrides = CliOverrides { port, ..Default::default() };
    let ctx = match load_context(config, verbose, overrides) {
        Ok(ctx) => ctx,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    // Bring the served tree up to date before binding the port
    let prerequisite = match env {
        ServeEnv::Dev => registry::TEMPLATES,
        ServeEnv::Build => registry::BUILD,
    };

    let plan = registry::create_task_plan();
    match ParallelExecutor::new(ctx.clone()).run(&plan, prerequisite) {
        Ok(result) if result.is_success() => {
            if verbose {
                println!("{}", result.summary());
            }
        }
        Ok(result) => {
            eprintln!("{}", result.summary());
            return ExitCode::from(EXIT_ERROR);
        }
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let options = ServeOptions { env, port, live_reload: !no_reload };
    match serve(&ctx, &options) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
