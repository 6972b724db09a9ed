//! Pipeline result types.
//!
//! Contains types for representing the outcome of a pipeline run.

use std::path::PathBuf;
use std::time::Duration;

/// Status of a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task action completed
    Success,
    /// Task never started because a dependency failed (or fail-fast stopped
    /// the run before it was scheduled)
    Skipped,
    /// Task action failed
    Failed(String),
}

impl TaskStatus {
    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed(_))
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Skipped => write!(f, "skipped"),
            TaskStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of running a single task.
#[derive(Debug, Clone)]
pub struct TaskRunResult {
    /// Task name
    pub task: String,
    /// Outcome
    pub status: TaskStatus,
    /// Output files produced by the action
    pub outputs: Vec<PathBuf>,
    /// Task duration
    pub duration: Duration,
}

impl TaskRunResult {
    /// Create a successful result.
    pub fn success(task: String, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self { task, status: TaskStatus::Success, outputs, duration }
    }

    /// Create a skipped result.
    pub fn skipped(task: String) -> Self {
        Self { task, status: TaskStatus::Skipped, outputs: vec![], duration: Duration::ZERO }
    }

    /// Create a failed result.
    pub fn failed(task: String, error: String, duration: Duration) -> Self {
        Self { task, status: TaskStatus::Failed(error), outputs: vec![], duration }
    }
}

/// Result of a complete pipeline run.
#[derive(Debug, Default)]
pub struct PipelineResult {
    /// Results in execution order
    pub tasks: Vec<TaskRunResult>,
    /// Total wall-clock duration
    pub total_duration: Duration,
}

impl PipelineResult {
    /// Create a new empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task result.
    pub fn add_result(&mut self, result: TaskRunResult) {
        self.tasks.push(result);
    }

    /// Get the number of successful tasks.
    pub fn success_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status == TaskStatus::Success).count()
    }

    /// Get the number of skipped tasks.
    pub fn skipped_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status == TaskStatus::Skipped).count()
    }

    /// Get the number of failed tasks.
    pub fn failed_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if the overall run succeeded (no failures and no skips).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0 && self.skipped_count() == 0
    }

    /// Get the result for a named task, if it was part of the run.
    pub fn task(&self, name: &str) -> Option<&TaskRunResult> {
        self.tasks.iter().find(|r| r.task == name)
    }

    /// Get failed task results.
    pub fn failures(&self) -> Vec<&TaskRunResult> {
        self.tasks.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Format a summary of the run.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let success = self.success_count();
        let skipped = self.skipped_count();
        let failed = self.failed_count();
        let total = self.tasks.len();

        if failed > 0 {
            lines.push(format!(
                "Pipeline failed: {} succeeded, {} skipped, {} failed ({} total)",
                success, skipped, failed, total
            ));
            for task in self.failures() {
                lines.push(format!("  - {}: {}", task.task, task.status));
            }
        } else {
            lines.push(format!(
                "Pipeline succeeded: {} tasks in {:?}",
                total, self.total_duration
            ));
        }

        lines.join("\n")
    }
}
