//! Template wiring for the wiredep and inject tasks.
//!
//! The base template carries comment markers that this module rewrites:
//!
//! ```html
//! <!-- wiredep:css --> ... <!-- endwiredep -->   vendor stylesheets
//! <!-- wiredep:js -->  ... <!-- endwiredep -->   vendor scripts
//! <!-- inject:js -->   ... <!-- endinject -->    app scripts
//! <!-- inject:css -->  ... <!-- endinject -->    compiled CSS from temp
//! ```
//!
//! `wiredep` reads the source template and writes the wired result under
//! the temp directory; `inject` then rewrites that wired copy in place once
//! compiled CSS exists. A missing marker block is not an error - the block
//! is simply left untouched.

use crate::assets::static_files::discover_files;
use crate::pipeline::context::PipelineContext;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Error during template wiring.
#[derive(Debug)]
pub enum HtmlError {
    /// The base template does not exist
    MissingTemplate(PathBuf),
    /// The wired template is missing (wiredep has not produced it)
    MissingWiredTemplate(PathBuf),
    /// Invalid glob pattern for app scripts
    InvalidPattern(String),
    /// IO error
    Io(PathBuf, std::io::Error),
}

impl std::fmt::Display for HtmlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HtmlError::MissingTemplate(path) => {
                write!(f, "Base template not found: {}", path.display())
            }
            HtmlError::MissingWiredTemplate(path) => {
                write!(f, "Wired template not found (wiredep must run first): {}", path.display())
            }
            HtmlError::InvalidPattern(msg) => write!(f, "Invalid script glob: {}", msg),
            HtmlError::Io(path, err) => write!(f, "{}: {}", path.display(), err),
        }
    }
}

impl std::error::Error for HtmlError {}

/// Path of the wired template under the temp directory.
pub fn wired_template_path(ctx: &PipelineContext) -> PathBuf {
    let base_name = ctx
        .config()
        .templates
        .base
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "base.html".into());
    ctx.temp_dir().join("templates").join(base_name)
}

/// URL prefix for a project-root directory, e.g. `.tmp` -> `/.tmp`.
fn url_prefix(dir: &Path) -> String {
    format!("/{}", dir.to_string_lossy().trim_start_matches("./"))
}

/// Rewrite the vendor and app-script markers in the base template.
///
/// Vendor references come from the config's library manifest in declaration
/// order (exclusions applied); app scripts come from the configured globs,
/// sorted. The wired result is written under the temp directory.
pub fn wiredep(ctx: &PipelineContext) -> Result<Vec<PathBuf>, HtmlError> {
    let base = ctx.src_dir().join(&ctx.config().templates.base);
    if !base.is_file() {
        return Err(HtmlError::MissingTemplate(base));
    }

    if ctx.is_verbose() {
        println!("Wiring vendor dependencies into {}", base.display());
    }

    let html = std::fs::read_to_string(&base).map_err(|e| HtmlError::Io(base.clone(), e))?;

    // Vendor files, split by extension
    let vendor_prefix = url_prefix(&ctx.config().vendor.dir);
    let vendor_files = ctx.config().vendor_files();
    let css_tags: Vec<String> = vendor_files
        .iter()
        .filter(|f| f.ends_with(".css"))
        .map(|f| css_tag(&format!("{}/{}", vendor_prefix, f)))
        .collect();
    let js_tags: Vec<String> = vendor_files
        .iter()
        .filter(|f| f.ends_with(".js"))
        .map(|f| js_tag(&format!("{}/{}", vendor_prefix, f)))
        .collect();

    // App scripts, sorted src-relative
    let src_dir = ctx.src_dir();
    let mut app_scripts = Vec::new();
    for pattern in &ctx.config().scripts.sources {
        let files = discover_files(&src_dir, pattern)
            .map_err(|e| HtmlError::InvalidPattern(e.to_string()))?;
        app_scripts.extend(files);
    }
    app_scripts.sort();
    app_scripts.dedup();
    let app_tags: Vec<String> = app_scripts
        .iter()
        .map(|p| {
            let rel = p.strip_prefix(&src_dir).unwrap_or(p);
            js_tag(&format!("/{}", rel.to_string_lossy()))
        })
        .collect();

    let html = replace_block(&html, "wiredep:css", "endwiredep", &css_tags);
    let html = replace_block(&html, "wiredep:js", "endwiredep", &js_tags);
    let html = replace_block(&html, "inject:js", "endinject", &app_tags);

    let out = wired_template_path(ctx);
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).map_err(|e| HtmlError::Io(parent.to_path_buf(), e))?;
    }
    std::fs::write(&out, html).map_err(|e| HtmlError::Io(out.clone(), e))?;

    Ok(vec![out])
}

/// Inject compiled CSS references into the wired template.
pub fn inject(ctx: &PipelineContext) -> Result<Vec<PathBuf>, HtmlError> {
    let wired = wired_template_path(ctx);
    if !wired.is_file() {
        return Err(HtmlError::MissingWiredTemplate(wired));
    }

    if ctx.is_verbose() {
        println!("Injecting compiled CSS into {}", wired.display());
    }

    let html =
        std::fs::read_to_string(&wired).map_err(|e| HtmlError::Io(wired.clone(), e))?;

    // Compiled stylesheets live flat in the temp dir
    let temp_dir = ctx.temp_dir();
    let temp_prefix = url_prefix(&ctx.config().project.temp);
    let mut css_files: Vec<PathBuf> = std::fs::read_dir(&temp_dir)
        .map_err(|e| HtmlError::Io(temp_dir.clone(), e))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("css"))
        .collect();
    css_files.sort();

    let css_tags: Vec<String> = css_files
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .map(|name| css_tag(&format!("{}/{}", temp_prefix, name)))
        .collect();

    let html = replace_block(&html, "inject:css", "endinject", &css_tags);
    std::fs::write(&wired, html).map_err(|e| HtmlError::Io(wired.clone(), e))?;

    Ok(vec![wired])
}

fn css_tag(url: &str) -> String {
    format!("<link rel=\"stylesheet\" href=\"{}\">", url)
}

fn js_tag(url: &str) -> String {
    format!("<script src=\"{}\"></script>", url)
}

/// Replace the contents of a marker block, keeping the markers.
///
/// Missing markers leave the document unchanged.
fn replace_block(html: &str, open: &str, close: &str, tags: &[String]) -> String {
    let re = Regex::new(&format!(
        r"(?s)(<!--\s*{}\s*-->)(.*?)(<!--\s*{}\s*-->)",
        regex::escape(open),
        regex::escape(close)
    ))
    .unwrap();

    re.replace_all(html, |caps: &regex::Captures| {
        if tags.is_empty() {
            format!("{}\n{}", &caps[1], &caps[3])
        } else {
            format!("{}\n{}\n{}", &caps[1], tags.join("\n"), &caps[3])
        }
    })
    .into_owned()
}
