//! Static asset copying for the fonts and images tasks.
//!
//! Files matching the configured globs are copied from the source tree into
//! the build directory, preserving their path relative to the source dir.
//! Individual copies within a task are independent and run in parallel.

use crate::pipeline::context::PipelineContext;
use glob::glob;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Error during static asset copying.
#[derive(Debug)]
pub enum CopyError {
    /// Invalid glob pattern
    InvalidPattern(String, glob::PatternError),
    /// IO error for a specific file
    Io(PathBuf, std::io::Error),
}

impl std::fmt::Display for CopyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CopyError::InvalidPattern(pattern, err) => {
                write!(f, "Invalid glob pattern '{}': {}", pattern, err)
            }
            CopyError::Io(path, err) => write!(f, "{}: {}", path.display(), err),
        }
    }
}

impl std::error::Error for CopyError {}

/// Copy font files into the build directory.
pub fn copy_fonts(ctx: &PipelineContext) -> Result<Vec<PathBuf>, CopyError> {
    if ctx.is_verbose() {
        println!("Copying fonts");
    }
    copy_globs(ctx, &ctx.config().fonts.sources)
}

/// Copy image files into the build directory.
pub fn copy_images(ctx: &PipelineContext) -> Result<Vec<PathBuf>, CopyError> {
    if ctx.is_verbose() {
        println!("Copying images");
    }
    copy_globs(ctx, &ctx.config().images.sources)
}

/// Discover files matching a glob under the source directory.
pub fn discover_files(src_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, CopyError> {
    let full_pattern = src_dir.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let paths = glob(&pattern_str)
        .map_err(|e| CopyError::InvalidPattern(pattern.to_string(), e))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => {
                eprintln!("Warning: error reading path: {}", e);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Copy every file matched by the globs, preserving src-relative layout.
fn copy_globs(ctx: &PipelineContext, patterns: &[String]) -> Result<Vec<PathBuf>, CopyError> {
    let src_dir = ctx.src_dir();
    let build_dir = ctx.build_dir();

    let mut sources = Vec::new();
    for pattern in patterns {
        sources.extend(discover_files(&src_dir, pattern)?);
    }
    sources.sort();
    sources.dedup();

    sources
        .par_iter()
        .map(|source| {
            let rel = source.strip_prefix(&src_dir).unwrap_or(source);
            let dest = build_dir.join(rel);

            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CopyError::Io(parent.to_path_buf(), e))?;
            }
            std::fs::copy(source, &dest).map_err(|e| CopyError::Io(source.clone(), e))?;
            Ok(dest)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_ctx(root: &Path) -> PipelineContext {
        let config = toml::from_str("[project]\nname = \"test\"").unwrap();
        PipelineContext::new(config, root.to_path_buf())
    }

    fn write(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_copy_fonts_preserves_layout() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());

        write(&temp.path().join("src/fonts/body.woff2"), b"font");
        write(&temp.path().join("src/fonts/icons/icons.woff"), b"icons");

        let copied = copy_fonts(&ctx).unwrap();
        assert_eq!(copied.len(), 2);
        assert!(temp.path().join("build/fonts/body.woff2").exists());
        assert!(temp.path().join("build/fonts/icons/icons.woff").exists());
    }

    #[test]
    fn test_copy_images() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());

        write(&temp.path().join("src/images/logo.png"), b"png");

        let copied = copy_images(&ctx).unwrap();
        assert_eq!(copied, vec![temp.path().join("build/images/logo.png")]);
        assert_eq!(fs::read(temp.path().join("build/images/logo.png")).unwrap(), b"png");
    }

    #[test]
    fn test_copy_with_no_matches_is_empty() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());
        fs::create_dir_all(temp.path().join("src")).unwrap();

        let copied = copy_images(&ctx).unwrap();
        assert!(copied.is_empty());
    }

    #[test]
    fn test_discover_files_sorted_files_only() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("src/images/b.png"), b"b");
        write(&temp.path().join("src/images/a.png"), b"a");
        fs::create_dir_all(temp.path().join("src/images/subdir")).unwrap();

        let files = discover_files(&temp.path().join("src"), "images/**/*").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.png"));
        assert!(files[1].ends_with("b.png"));
    }
}
