//! Task definitions and the dependency graph.
//!
//! A task is a named build step with declared dependencies and an action.
//! The plan holds the full registry and computes execution order; a cycle
//! or an unknown name is rejected here, before any task executes.

use std::collections::HashSet;

/// The action a task performs when it runs.
///
/// Actions are declarative; the executor dispatches them to the asset
/// modules with the pipeline context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    /// Remove compiled CSS from the temp and build directories
    CleanStyles,
    /// Remove fonts from the build directory
    CleanFonts,
    /// Remove images from the build directory
    CleanImages,
    /// Remove generated JS/HTML from the temp and build directories
    CleanCode,
    /// Remove the whole temp and build directories
    CleanAll,
    /// Compile entry stylesheets into the temp directory
    Styles,
    /// Copy fonts into the build directory
    Fonts,
    /// Copy images into the build directory
    Images,
    /// Rewrite vendor and app-script markers in the base template
    Wiredep,
    /// Inject compiled CSS references into the wired template
    Inject,
    /// Render page templates against the JSON data file
    Templates,
    /// Concatenate, minify, fingerprint and rewrite root HTML assets
    Optimize,
    /// Discard the temp directory after a successful build
    DiscardTemp,
    /// No action; completes once dependencies complete
    Group,
}

/// A named build step.
#[derive(Debug, Clone)]
pub struct Task {
    /// Unique task name
    pub name: String,
    /// Names of tasks that must complete successfully first
    pub dependencies: Vec<String>,
    /// What the task does
    pub action: TaskAction,
}

impl Task {
    /// Create a task with no dependencies.
    pub fn new(name: impl Into<String>, action: TaskAction) -> Self {
        Self { name: name.into(), dependencies: vec![], action }
    }

    /// Add dependencies to this task.
    pub fn with_deps(mut self, deps: &[&str]) -> Self {
        self.dependencies.extend(deps.iter().map(|d| d.to_string()));
        self
    }
}

/// Error computing the execution order.
#[derive(Debug, PartialEq, Eq)]
pub enum PlanError {
    /// A requested or referenced task name is not in the registry
    UnknownTask(String),
    /// Circular dependency detected
    CyclicDependency(String),
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::UnknownTask(name) => write!(f, "Unknown task '{}'", name),
            PlanError::CyclicDependency(name) => {
                write!(f, "Circular dependency detected involving task '{}'", name)
            }
        }
    }
}

impl std::error::Error for PlanError {}

/// The full task registry with dependency information.
#[derive(Debug, Default)]
pub struct TaskPlan {
    tasks: Vec<Task>,
}

impl TaskPlan {
    /// Create a new empty plan.
    pub fn new() -> Self {
        Self { tasks: vec![] }
    }

    /// Add a task to the plan.
    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Get all tasks in the plan.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Look up a task by name.
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Get the number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Compute the transitive dependency closure of a requested task.
    ///
    /// Returns the names of every task that must run, including the target
    /// itself. Fails if the target or any referenced dependency is unknown,
    /// or if the graph contains a cycle.
    pub fn closure(&self, target: &str) -> Result<HashSet<String>, PlanError> {
        // Validate the whole subgraph eagerly: an unknown dependency or a
        // cycle must surface before anything executes.
        self.ordered_closure(target)
            .map(|tasks| tasks.into_iter().map(|t| t.name.clone()).collect())
    }

    /// Get the tasks required for a target, dependencies first.
    ///
    /// The order is a topological sort of the target's transitive closure:
    /// every task appears exactly once, after all of its dependencies.
    pub fn ordered_closure(&self, target: &str) -> Result<Vec<&Task>, PlanError> {
        let start = self.get(target).ok_or_else(|| PlanError::UnknownTask(target.to_string()))?;

        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut visiting = HashSet::new();
        self.visit_task(start, &mut visited, &mut visiting, &mut result)?;

        Ok(result)
    }

    /// Get all tasks in dependency order.
    pub fn build_order(&self) -> Result<Vec<&Task>, PlanError> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut visiting = HashSet::new();

        for task in &self.tasks {
            self.visit_task(task, &mut visited, &mut visiting, &mut result)?;
        }

        Ok(result)
    }

    fn visit_task<'a>(
        &'a self,
        task: &'a Task,
        visited: &mut HashSet<String>,
        visiting: &mut HashSet<String>,
        result: &mut Vec<&'a Task>,
    ) -> Result<(), PlanError> {
        if visited.contains(&task.name) {
            return Ok(());
        }

        if visiting.contains(&task.name) {
            return Err(PlanError::CyclicDependency(task.name.clone()));
        }

        visiting.insert(task.name.clone());

        for dep_name in &task.dependencies {
            let dep = self
                .get(dep_name)
                .ok_or_else(|| PlanError::UnknownTask(dep_name.clone()))?;
            self.visit_task(dep, visited, visiting, result)?;
        }

        visiting.remove(&task.name);
        visited.insert(task.name.clone());
        result.push(task);

        Ok(())
    }
}
