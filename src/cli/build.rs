//! Build-related command implementations (build, run, clean, tasks)

use std::path::Path;
use std::process::ExitCode;

use super::{load_context, EXIT_ERROR, EXIT_SUCCESS};
use crate::config::CliOverrides;
use crate::pipeline::{registry, ParallelExecutor, PipelineResult, TaskExecutor};

/// Run the full build pipeline.
pub fn run_build(
    config: Option<&Path>,
    verbose: bool,
    fail_fast: bool,
    jobs: Option<usize>,
    dry_run: bool,
) -> ExitCode {
    run_named_task(config, verbose, registry::BUILD, fail_fast, jobs, dry_run)
}

/// Run a single registry task (and its dependencies).
pub fn run_task(
    config: Option<&Path>,
    verbose: bool,
    task: &str,
    fail_fast: bool,
    jobs: Option<usize>,
) -> ExitCode {
    run_named_task(config, verbose, task, fail_fast, jobs, false)
}

/// Remove the build and temp directories.
pub fn run_clean(config: Option<&Path>, verbose: bool) -> ExitCode {
    run_named_task(config, verbose, registry::CLEAN, false, Some(1), false)
}

fn run_named_task(
    config: Option<&Path>,
    verbose: bool,
    task: &str,
    fail_fast: bool,
    jobs: Option<usize>,
    dry_run: bool,
) -> ExitCode {
    let ctx = match load_context(config, verbose, CliOverrides::default()) {
        Ok(ctx) => ctx,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let plan = registry::create_task_plan();

    // Dry runs and single-job runs use the sequential executor; everything
    // else runs waves of independent tasks in parallel.
    let outcome = if dry_run || jobs == Some(1) {
        TaskExecutor::new(ctx).with_fail_fast(fail_fast).with_dry_run(dry_run).run(&plan, task)
    } else {
        let mut executor = ParallelExecutor::new(ctx).with_fail_fast(fail_fast);
        if let Some(jobs) = jobs {
            executor = executor.with_jobs(jobs);
        }
        executor.run(&plan, task)
    };

    match outcome {
        Ok(result) => report(&result),
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn report(result: &PipelineResult) -> ExitCode {
    if result.is_success() {
        println!("{}", result.summary());
        ExitCode::from(EXIT_SUCCESS)
    } else {
        eprintln!("{}", result.summary());
        ExitCode::from(EXIT_ERROR)
    }
}

/// List the registry tasks with their dependencies.
pub fn run_tasks() -> ExitCode {
    let plan = registry::create_task_plan();

    println!("Available tasks:");
    for name in registry::task_names() {
        let task = plan.get(name).expect("registry task");
        if task.dependencies.is_empty() {
            println!("  {}", task.name);
        } else {
            println!("  {} (depends on: {})", task.name, task.dependencies.join(", "));
        }
    }
    println!();
    println!("Run one with: sitesmith run <task>");

    ExitCode::from(EXIT_SUCCESS)
}
