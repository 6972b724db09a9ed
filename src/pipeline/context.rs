//! Pipeline context containing configuration and paths for a run.

use crate::config::SiteConfig;
use std::path::{Path, PathBuf};

/// Context shared by every task in a pipeline run.
///
/// Provides the loaded configuration, the project root, and resolved
/// directory paths. Cheap to clone; cloned into worker threads by the
/// parallel executor.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// The loaded configuration
    config: SiteConfig,
    /// Project root directory (where sitesmith.toml is located)
    project_root: PathBuf,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl PipelineContext {
    /// Create a new pipeline context.
    pub fn new(config: SiteConfig, project_root: PathBuf) -> Self {
        Self { config, project_root, verbose: false }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the source directory (resolved to absolute path).
    pub fn src_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.src)
    }

    /// Get the temp directory for intermediate artifacts.
    pub fn temp_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.temp)
    }

    /// Get the build output directory.
    pub fn build_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.build)
    }

    /// Get the vendor directory.
    pub fn vendor_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.vendor.dir)
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}
