//! Watch mode for automatic rebuilds on file changes.
//!
//! A single watcher registry owns the filesystem watches; change events
//! arrive debounced on one channel and are consumed by one dispatcher
//! loop. Rapid duplicate events inside a debounce window coalesce into a
//! single batch, so one save (or one editor write burst) triggers exactly
//! one rebuild and one client notification. A change arriving while a
//! rebuild is in flight stays queued on the channel and is handled by the
//! next loop iteration; it never interrupts the running rebuild.

use crate::pipeline::{registry, PipelineContext, TaskExecutor, TaskPlan};
use glob::Pattern;
use notify::RecursiveMode;
use notify_debouncer_mini::{
    new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, Instant};

/// Error during watch mode
#[derive(Debug)]
pub enum WatchError {
    /// Failed to initialize the file watcher
    WatcherInit(notify::Error),
    /// Failed to add a watch path
    WatchPath(PathBuf, notify::Error),
    /// A path set is already being watched
    AlreadyWatching(PathBuf),
    /// Channel receive error
    Channel(String),
    /// Source directory not found
    SourceNotFound(PathBuf),
}

impl std::fmt::Display for WatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchError::WatcherInit(e) => write!(f, "Failed to initialize file watcher: {}", e),
            WatchError::WatchPath(path, e) => {
                write!(f, "Failed to watch {}: {}", path.display(), e)
            }
            WatchError::AlreadyWatching(path) => {
                write!(f, "Already watching {}", path.display())
            }
            WatchError::Channel(msg) => write!(f, "Watch channel error: {}", msg),
            WatchError::SourceNotFound(path) => {
                write!(f, "Source directory not found: {}", path.display())
            }
        }
    }
}

impl std::error::Error for WatchError {}

/// What connected clients should do after a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// Swap stylesheets in place without a navigation
    RefreshCss,
    /// Reload the whole page
    FullReload,
}

/// Category of a changed file, used to pick the rebuild task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeCategory {
    /// Matches the styles watch glob
    Styles,
    /// Matches the template views globs or the data file
    Templates,
    /// Anything else under the source tree
    Other,
}

/// Explicit registry of filesystem watches.
///
/// Owns the debouncer and the set of watched roots; registering the same
/// root twice is an error. Dropping the registry tears down every watch.
pub struct WatcherRegistry {
    debouncer: Debouncer<notify::RecommendedWatcher>,
    rx: Receiver<DebounceEventResult>,
    watched: HashSet<PathBuf>,
}

impl WatcherRegistry {
    /// Create a registry with the given debounce window.
    pub fn new(debounce: Duration) -> Result<Self, WatchError> {
        let (tx, rx) = channel();
        let debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
        Ok(Self { debouncer, rx, watched: HashSet::new() })
    }

    /// Watch a directory recursively.
    pub fn watch(&mut self, path: &Path) -> Result<(), WatchError> {
        if !self.watched.insert(path.to_path_buf()) {
            return Err(WatchError::AlreadyWatching(path.to_path_buf()));
        }
        self.debouncer
            .watcher()
            .watch(path, RecursiveMode::Recursive)
            .map_err(|e| WatchError::WatchPath(path.to_path_buf(), e))
    }

    /// Check whether a path is registered.
    pub fn is_watching(&self, path: &Path) -> bool {
        self.watched.contains(path)
    }

    /// Block until the next debounced batch arrives.
    pub fn recv(&self) -> Result<DebounceEventResult, WatchError> {
        self.rx.recv().map_err(|e| WatchError::Channel(e.to_string()))
    }
}

/// Classify a changed path against the configured globs.
pub fn classify(ctx: &PipelineContext, path: &Path) -> ChangeCategory {
    let src_dir = ctx.src_dir();
    let rel = path.strip_prefix(&src_dir).unwrap_or(path);
    let config = ctx.config();

    if matches_pattern(&config.styles.watch, rel) {
        return ChangeCategory::Styles;
    }

    if rel == config.templates.data {
        return ChangeCategory::Templates;
    }
    for pattern in &config.templates.views {
        if matches_pattern(pattern, rel) {
            return ChangeCategory::Templates;
        }
    }

    ChangeCategory::Other
}

fn matches_pattern(pattern: &str, path: &Path) -> bool {
    Pattern::new(pattern).map(|p| p.matches_path(path)).unwrap_or(false)
}

/// Pick the single client notification for a batch of categories.
///
/// Stylesheet-only batches refresh CSS in place; anything else reloads.
pub fn batch_reload_kind(categories: &HashSet<ChangeCategory>) -> ReloadKind {
    if categories.len() == 1 && categories.contains(&ChangeCategory::Styles) {
        ReloadKind::RefreshCss
    } else {
        ReloadKind::FullReload
    }
}

/// Watch the source tree and rebuild on changes.
///
/// Blocks until the channel closes (normally never). After each successful
/// rebuild, `on_reload` is invoked exactly once with the notification for
/// the batch.
pub fn watch_and_rebuild<F>(
    ctx: &PipelineContext,
    plan: &TaskPlan,
    on_reload: F,
) -> Result<(), WatchError>
where
    F: Fn(ReloadKind),
{
    let src_dir = ctx.src_dir();
    if !src_dir.exists() {
        return Err(WatchError::SourceNotFound(src_dir));
    }

    let debounce = Duration::from_millis(ctx.config().watch.debounce_ms as u64);
    let mut watcher = WatcherRegistry::new(debounce)?;
    watcher.watch(&src_dir)?;

    println!("[{}] Watching {} for changes...", timestamp(), src_dir.display());

    loop {
        match watcher.recv()? {
            Ok(events) => {
                let changed: Vec<&PathBuf> = events
                    .iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .map(|e| &e.path)
                    .collect();

                if changed.is_empty() {
                    continue;
                }

                for path in &changed {
                    if let Some(name) = path.file_name() {
                        println!("[{}] Changed: {}", timestamp(), name.to_string_lossy());
                    }
                }

                let categories: HashSet<ChangeCategory> =
                    changed.iter().map(|p| classify(ctx, p)).collect();

                if rebuild_batch(ctx, plan, &categories) {
                    on_reload(batch_reload_kind(&categories));
                } else {
                    println!("[{}] Rebuild failed; waiting for changes...", timestamp());
                }
            }
            Err(error) => {
                // Watch error (non-fatal) - log but continue watching
                eprintln!("[{}] Watch error: {:?}", timestamp(), error);
            }
        }
    }
}

/// Run the rebuild tasks for a batch of change categories.
///
/// Returns true if every triggered task succeeded (a batch with no
/// triggered task counts as success - the client still gets its reload).
fn rebuild_batch(
    ctx: &PipelineContext,
    plan: &TaskPlan,
    categories: &HashSet<ChangeCategory>,
) -> bool {
    let executor = TaskExecutor::new(ctx.clone());
    let mut ok = true;

    if categories.contains(&ChangeCategory::Styles) {
        ok &= run_watched_task(&executor, plan, registry::STYLES);
    }
    if categories.contains(&ChangeCategory::Templates) {
        ok &= run_watched_task(&executor, plan, registry::TEMPLATES);
    }

    ok
}

fn run_watched_task(executor: &TaskExecutor, plan: &TaskPlan, task: &str) -> bool {
    let start = Instant::now();
    println!("[{}] Rebuilding {}...", timestamp(), task);

    match executor.run(plan, task) {
        Ok(result) if result.is_success() => {
            println!(
                "[{}] Rebuilt {} ({})",
                timestamp(),
                task,
                format_duration(start.elapsed())
            );
            true
        }
        Ok(result) => {
            eprintln!("[{}] {}", timestamp(), result.summary());
            false
        }
        Err(e) => {
            eprintln!("[{}] Rebuild error: {}", timestamp(), e);
            false
        }
    }
}

/// Format duration for display
pub(crate) fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Get current timestamp for logging
pub(crate) fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400; // seconds since midnight
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_ctx(root: &Path) -> PipelineContext {
        let config = toml::from_str("[project]\nname = \"test\"").unwrap();
        PipelineContext::new(config, root.to_path_buf())
    }

    #[test]
    fn test_classify_styles() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());

        let path = temp.path().join("src/styles/layout.css");
        assert_eq!(classify(&ctx, &path), ChangeCategory::Styles);
    }

    #[test]
    fn test_classify_templates_and_data() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());

        assert_eq!(
            classify(&ctx, &temp.path().join("src/templates/base.html")),
            ChangeCategory::Templates
        );
        assert_eq!(
            classify(&ctx, &temp.path().join("src/pages/about.html")),
            ChangeCategory::Templates
        );
        assert_eq!(
            classify(&ctx, &temp.path().join("src/templates/data.json")),
            ChangeCategory::Templates
        );
    }

    #[test]
    fn test_classify_other() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());

        assert_eq!(
            classify(&ctx, &temp.path().join("src/images/logo.png")),
            ChangeCategory::Other
        );
    }

    #[test]
    fn test_batch_reload_kind_styles_only() {
        let mut categories = HashSet::new();
        categories.insert(ChangeCategory::Styles);
        assert_eq!(batch_reload_kind(&categories), ReloadKind::RefreshCss);
    }

    #[test]
    fn test_batch_reload_kind_mixed() {
        let mut categories = HashSet::new();
        categories.insert(ChangeCategory::Styles);
        categories.insert(ChangeCategory::Other);
        assert_eq!(batch_reload_kind(&categories), ReloadKind::FullReload);
    }

    #[test]
    fn test_watcher_registry_rejects_duplicate() {
        let temp = TempDir::new().unwrap();
        let mut registry = WatcherRegistry::new(Duration::from_millis(50)).unwrap();

        registry.watch(temp.path()).unwrap();
        assert!(registry.is_watching(temp.path()));

        let err = registry.watch(temp.path()).unwrap_err();
        assert!(matches!(err, WatchError::AlreadyWatching(_)));
    }

    #[test]
    fn test_watch_missing_source_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());
        let plan = registry::create_task_plan();

        let result = watch_and_rebuild(&ctx, &plan, |_| {});
        assert!(matches!(result, Err(WatchError::SourceNotFound(_))));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
