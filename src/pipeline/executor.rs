//! Sequential task execution.
//!
//! Runs the transitive closure of a requested task in dependency order.
//! Failure policy: a failed task poisons its transitive dependents, which
//! are recorded as skipped without starting; unrelated branches continue.
//! In fail-fast mode no further task is scheduled after the first failure.

use crate::assets;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::result::{PipelineResult, TaskRunResult};
use crate::pipeline::task::{PlanError, Task, TaskAction, TaskPlan};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

/// Sequential executor for the task graph.
pub struct TaskExecutor {
    /// Pipeline context
    ctx: PipelineContext,
    /// Whether to stop scheduling after the first failure
    fail_fast: bool,
    /// Whether to print the plan without running actions
    dry_run: bool,
}

impl TaskExecutor {
    /// Create a new executor.
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx, fail_fast: false, dry_run: false }
    }

    /// Set fail-fast mode.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set dry-run mode (resolve and print the plan, run nothing).
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Get the context.
    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Run a task and everything it depends on.
    ///
    /// Plan errors (unknown task, cycle) are returned before any action
    /// executes; action failures are recorded in the result.
    pub fn run(&self, plan: &TaskPlan, target: &str) -> Result<PipelineResult, PlanError> {
        let start = Instant::now();
        let ordered = plan.ordered_closure(target)?;

        if self.ctx.is_verbose() {
            println!("Task plan for '{}': {} tasks", target, ordered.len());
            for task in &ordered {
                println!("  - {}", task.name);
            }
        }

        let mut result = PipelineResult::new();
        let mut halted: HashSet<String> = HashSet::new();
        let mut stop = false;

        for task in ordered {
            if stop || task.dependencies.iter().any(|d| halted.contains(d)) {
                halted.insert(task.name.clone());
                result.add_result(TaskRunResult::skipped(task.name.clone()));
                continue;
            }

            let run = self.execute_task(task);
            if run.status.is_failure() {
                halted.insert(task.name.clone());
                if self.fail_fast {
                    stop = true;
                }
            }
            result.add_result(run);
        }

        result.total_duration = start.elapsed();
        Ok(result)
    }

    /// Execute a single task.
    pub(crate) fn execute_task(&self, task: &Task) -> TaskRunResult {
        let start = Instant::now();

        if self.ctx.is_verbose() {
            println!("Running: {} ...", task.name);
        }

        if self.dry_run {
            return TaskRunResult::success(task.name.clone(), vec![], start.elapsed());
        }

        match self.run_action(&task.action) {
            Ok(outputs) => {
                let duration = start.elapsed();
                if self.ctx.is_verbose() {
                    println!("  Done in {:?}", duration);
                }
                TaskRunResult::success(task.name.clone(), outputs, duration)
            }
            Err(e) => {
                let duration = start.elapsed();
                eprintln!("Task '{}' failed: {}", task.name, e);
                TaskRunResult::failed(task.name.clone(), e, duration)
            }
        }
    }

    /// Dispatch a task action to the asset modules.
    fn run_action(&self, action: &TaskAction) -> Result<Vec<PathBuf>, String> {
        let ctx = &self.ctx;
        match action {
            TaskAction::CleanStyles => assets::clean::clean_styles(ctx),
            TaskAction::CleanFonts => assets::clean::clean_fonts(ctx),
            TaskAction::CleanImages => assets::clean::clean_images(ctx),
            TaskAction::CleanCode => assets::clean::clean_code(ctx),
            TaskAction::CleanAll => assets::clean::clean_all(ctx),
            TaskAction::Styles => {
                assets::styles::compile_styles(ctx).map_err(|e| e.to_string())
            }
            TaskAction::Fonts => {
                assets::static_files::copy_fonts(ctx).map_err(|e| e.to_string())
            }
            TaskAction::Images => {
                assets::static_files::copy_images(ctx).map_err(|e| e.to_string())
            }
            TaskAction::Wiredep => assets::html::wiredep(ctx).map_err(|e| e.to_string()),
            TaskAction::Inject => assets::html::inject(ctx).map_err(|e| e.to_string()),
            TaskAction::Templates => {
                assets::templates::render_pages(ctx).map_err(|e| e.to_string())
            }
            TaskAction::Optimize => assets::optimize::optimize(ctx).map_err(|e| e.to_string()),
            TaskAction::DiscardTemp => assets::clean::discard_temp(ctx),
            TaskAction::Group => Ok(vec![]),
        }
    }
}
