//! Glob-driven deletion for the clean tasks.
//!
//! Each asset category has its own clean task so a rebuild of one category
//! never disturbs another's output. Paths are partitioned by task; the
//! deletion sets below never overlap with a concurrently running producer.

use crate::pipeline::context::PipelineContext;
use glob::glob;
use std::path::{Path, PathBuf};

/// Remove compiled CSS from the temp and build directories.
pub fn clean_styles(ctx: &PipelineContext) -> Result<Vec<PathBuf>, String> {
    remove_matching(
        ctx,
        &[
            pattern(&ctx.temp_dir(), "**/*.css"),
            pattern(&ctx.build_dir(), "styles/**/*.css"),
        ],
    )
}

/// Remove fonts from the build directory.
pub fn clean_fonts(ctx: &PipelineContext) -> Result<Vec<PathBuf>, String> {
    remove_matching(ctx, &[pattern(&ctx.build_dir(), "fonts/**/*")])
}

/// Remove images from the build directory.
pub fn clean_images(ctx: &PipelineContext) -> Result<Vec<PathBuf>, String> {
    remove_matching(ctx, &[pattern(&ctx.build_dir(), "images/**/*")])
}

/// Remove generated JS and HTML from the temp and build directories.
pub fn clean_code(ctx: &PipelineContext) -> Result<Vec<PathBuf>, String> {
    remove_matching(
        ctx,
        &[
            pattern(&ctx.temp_dir(), "**/*.js"),
            pattern(&ctx.build_dir(), "js/**/*.js"),
            pattern(&ctx.build_dir(), "**/*.html"),
        ],
    )
}

/// Remove the whole build and temp directories.
pub fn clean_all(ctx: &PipelineContext) -> Result<Vec<PathBuf>, String> {
    let mut removed = Vec::new();
    for dir in [ctx.build_dir(), ctx.temp_dir()] {
        if dir.exists() {
            if ctx.is_verbose() {
                println!("Cleaning: {}", dir.display());
            }
            std::fs::remove_dir_all(&dir)
                .map_err(|e| format!("Failed to remove {}: {}", dir.display(), e))?;
            removed.push(dir);
        }
    }
    Ok(removed)
}

/// Discard the temp directory after a successful build.
pub fn discard_temp(ctx: &PipelineContext) -> Result<Vec<PathBuf>, String> {
    let temp = ctx.temp_dir();
    if temp.exists() {
        std::fs::remove_dir_all(&temp)
            .map_err(|e| format!("Failed to remove {}: {}", temp.display(), e))?;
    }
    Ok(vec![])
}

fn pattern(base: &Path, suffix: &str) -> String {
    base.join(suffix).to_string_lossy().into_owned()
}

/// Delete every file matching the given patterns.
///
/// Directories themselves are left in place; only files are removed.
fn remove_matching(ctx: &PipelineContext, patterns: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut removed = Vec::new();

    for pattern in patterns {
        if ctx.is_verbose() {
            println!("Cleaning: {}", pattern);
        }

        let paths =
            glob(pattern).map_err(|e| format!("Invalid clean pattern '{}': {}", pattern, e))?;

        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    eprintln!("Warning: error reading path during clean: {}", e);
                    continue;
                }
            };

            if path.is_file() {
                std::fs::remove_file(&path)
                    .map_err(|e| format!("Failed to remove {}: {}", path.display(), e))?;
                removed.push(path);
            }
        }
    }

    Ok(removed)
}
