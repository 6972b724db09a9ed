//! Parallel task execution.
//!
//! Groups independent tasks into waves that can run concurrently.
//!
//! # How It Works
//!
//! 1. Analyze the dependency graph to find the "depth" of each task
//! 2. Group tasks into levels where all dependencies are in earlier levels
//! 3. Execute each level on a pool of scoped worker threads
//! 4. Wait for all tasks in a level to complete before starting the next
//!
//! Failure policy matches the sequential executor: a failure poisons the
//! transitive dependents (recorded as skipped), independent tasks in the
//! same or later waves still run, and fail-fast stops scheduling new waves
//! while letting in-flight tasks finish.

use crate::pipeline::context::PipelineContext;
use crate::pipeline::executor::TaskExecutor;
use crate::pipeline::result::{PipelineResult, TaskRunResult};
use crate::pipeline::task::{PlanError, Task, TaskPlan};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Default number of parallel jobs (uses available parallelism).
fn default_jobs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Parallel executor for the task graph.
pub struct ParallelExecutor {
    /// Inner executor used for individual task actions
    inner: TaskExecutor,
    /// Number of parallel jobs
    jobs: usize,
    /// Whether to stop scheduling new waves after the first failure
    fail_fast: bool,
}

impl ParallelExecutor {
    /// Create a new parallel executor.
    pub fn new(ctx: PipelineContext) -> Self {
        Self { inner: TaskExecutor::new(ctx), jobs: default_jobs(), fail_fast: false }
    }

    /// Set the number of parallel jobs.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Set fail-fast mode.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.inner = self.inner.with_fail_fast(fail_fast);
        self.fail_fast = fail_fast;
        self
    }

    /// Get the number of parallel jobs.
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Run a task and everything it depends on, waves in parallel.
    pub fn run(&self, plan: &TaskPlan, target: &str) -> Result<PipelineResult, PlanError> {
        let start = Instant::now();
        let ordered = plan.ordered_closure(target)?;
        let levels = compute_levels(&ordered)?;

        if self.inner.context().is_verbose() {
            println!(
                "Parallel run for '{}': {} tasks in {} waves ({} workers)",
                target,
                ordered.len(),
                levels.len(),
                self.jobs
            );
            for (i, level) in levels.iter().enumerate() {
                let names: Vec<_> = level.iter().map(|t| t.name.as_str()).collect();
                println!("  Wave {}: {:?}", i, names);
            }
        }

        let mut result = PipelineResult::new();
        let halted: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
        let mut stop = false;

        for level in levels {
            if stop {
                let mut halted = halted.lock().unwrap();
                for task in level {
                    halted.insert(task.name.clone());
                    result.add_result(TaskRunResult::skipped(task.name.clone()));
                }
                continue;
            }

            let wave_results = self.execute_level(&level, &halted);

            for run in wave_results {
                if run.status.is_failure() && self.fail_fast {
                    stop = true;
                }
                result.add_result(run);
            }
        }

        result.total_duration = start.elapsed();
        Ok(result)
    }

    /// Execute one wave of tasks on worker threads.
    fn execute_level(
        &self,
        tasks: &[&Task],
        halted: &Mutex<HashSet<String>>,
    ) -> Vec<TaskRunResult> {
        if tasks.is_empty() {
            return vec![];
        }

        // A single worker or a single task degenerates to sequential order
        if self.jobs == 1 || tasks.len() == 1 {
            return tasks.iter().map(|t| self.execute_one(t, halted)).collect();
        }

        let results = Mutex::new(Vec::new());
        let next_idx = AtomicUsize::new(0);

        std::thread::scope(|s| {
            let num_workers = self.jobs.min(tasks.len());

            for _ in 0..num_workers {
                let results = &results;
                let next_idx = &next_idx;

                s.spawn(move || loop {
                    let idx = next_idx.fetch_add(1, Ordering::SeqCst);
                    if idx >= tasks.len() {
                        break;
                    }

                    let run = self.execute_one(tasks[idx], halted);
                    results.lock().unwrap().push((idx, run));
                });
            }
        });

        // Sort by original index so output order is deterministic
        let mut results = results.into_inner().unwrap();
        results.sort_by_key(|(idx, _)| *idx);
        results.into_iter().map(|(_, r)| r).collect()
    }

    /// Execute one task, honoring the shared halt set.
    ///
    /// The lock is held only for the dependency check, never while the
    /// action runs.
    fn execute_one(&self, task: &Task, halted: &Mutex<HashSet<String>>) -> TaskRunResult {
        {
            let mut halted = halted.lock().unwrap();
            if task.dependencies.iter().any(|d| halted.contains(d)) {
                halted.insert(task.name.clone());
                return TaskRunResult::skipped(task.name.clone());
            }
        }

        let run = self.inner.execute_task(task);
        if run.status.is_failure() {
            halted.lock().unwrap().insert(task.name.clone());
        }
        run
    }
}

/// Compute dependency levels for an ordered closure.
///
/// Returns waves where every task's dependencies live in earlier waves.
/// Dependencies outside the closure (possible when a caller passes a
/// partial slice) are treated as already satisfied.
pub fn compute_levels<'a>(tasks: &[&'a Task]) -> Result<Vec<Vec<&'a Task>>, PlanError> {
    if tasks.is_empty() {
        return Ok(vec![]);
    }

    let in_plan: HashSet<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
    let mut levels_map: HashMap<&str, usize> = HashMap::new();
    let mut remaining: Vec<&Task> = tasks.to_vec();
    let mut current_level = 0;

    while !remaining.is_empty() {
        let (ready, pending): (Vec<&Task>, Vec<&Task>) = remaining.into_iter().partition(|t| {
            t.dependencies
                .iter()
                .all(|d| !in_plan.contains(d.as_str()) || levels_map.contains_key(d.as_str()))
        });

        if ready.is_empty() {
            // Unreachable when the closure came from ordered_closure, which
            // already rejects cycles.
            return Err(PlanError::CyclicDependency(pending[0].name.clone()));
        }

        for task in &ready {
            levels_map.insert(task.name.as_str(), current_level);
        }

        remaining = pending;
        current_level += 1;
    }

    let max_level = levels_map.values().copied().max().unwrap_or(0);
    let mut result: Vec<Vec<&Task>> = vec![Vec::new(); max_level + 1];
    for task in tasks {
        if let Some(&level) = levels_map.get(task.name.as_str()) {
            result[level].push(task);
        }
    }

    Ok(result)
}
