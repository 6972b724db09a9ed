//! Page template rendering.
//!
//! Pages matched by the configured globs are rendered to final HTML in the
//! source root:
//!
//! - `{% include "name" %}` pulls in a fragment, resolved against the wired
//!   template directory in temp first and the source template directory
//!   second, so pages pick up the dependency-wired base.
//! - `{{ key }}` substitutes a value from the JSON data file; dotted keys
//!   (`site.title`) walk nested objects.
//!
//! A missing include or unknown key is a transform error naming the page.

use crate::assets::static_files::discover_files;
use crate::pipeline::context::PipelineContext;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Includes may nest, but not indefinitely.
const MAX_INCLUDE_DEPTH: usize = 10;

/// Error during template rendering
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TemplateError {
    /// The JSON data file does not exist
    #[error("Template data file not found: {0}")]
    MissingData(PathBuf),
    /// The JSON data file is malformed
    #[error("{file}: {source}")]
    DataParse {
        file: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// An include could not be resolved
    #[error("{page}: include not found: {include}")]
    MissingInclude { page: PathBuf, include: String },
    /// Includes nested deeper than the limit (usually a cycle)
    #[error("{page}: includes nested deeper than {MAX_INCLUDE_DEPTH} levels")]
    IncludeDepth { page: PathBuf },
    /// A placeholder references a key missing from the data file
    #[error("{page}: unknown template key '{key}'")]
    UnknownKey { page: PathBuf, key: String },
    /// A placeholder references a non-scalar value
    #[error("{page}: template key '{key}' is not a string, number, or bool")]
    NonScalarKey { page: PathBuf, key: String },
    /// Invalid glob pattern for pages
    #[error("Invalid pages glob: {0}")]
    InvalidPattern(String),
    /// File I/O error
    #[error("{file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn include_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\{%\s*include\s+["']([^"']+)["']\s*%\}"#).unwrap())
}

fn var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_][A-Za-z0-9_.-]*)\s*\}\}").unwrap())
}

/// Render all configured pages into the source root.
pub fn render_pages(ctx: &PipelineContext) -> Result<Vec<PathBuf>, TemplateError> {
    let src_dir = ctx.src_dir();
    let data = load_data(ctx)?;

    // Include lookup: wired templates in temp shadow the source templates
    let template_dir = src_dir.join(
        ctx.config().templates.base.parent().unwrap_or(Path::new("templates")),
    );
    let include_dirs = [ctx.temp_dir().join("templates"), template_dir];

    let mut outputs = Vec::new();
    for pattern in &ctx.config().templates.pages {
        let prefix = glob_static_prefix(pattern);
        let pages = discover_files(&src_dir, pattern)
            .map_err(|e| TemplateError::InvalidPattern(e.to_string()))?;

        for page in pages {
            if ctx.is_verbose() {
                println!("Rendering: {}", page.display());
            }

            let source = std::fs::read_to_string(&page)
                .map_err(|e| TemplateError::Io { file: page.clone(), source: e })?;

            let expanded = expand_includes(&source, &page, &include_dirs)?;
            let rendered = substitute_vars(&expanded, &page, &data)?;

            // Pages land in the source root, stripped of the glob's static
            // prefix: src/pages/about.html -> src/about.html
            let rel = page
                .strip_prefix(src_dir.join(&prefix))
                .or_else(|_| page.strip_prefix(&src_dir))
                .unwrap_or(&page);
            let mut out = src_dir.join(rel);
            out.set_extension("html");

            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| TemplateError::Io { file: parent.to_path_buf(), source: e })?;
            }
            std::fs::write(&out, rendered)
                .map_err(|e| TemplateError::Io { file: out.clone(), source: e })?;
            outputs.push(out);
        }
    }

    Ok(outputs)
}

/// Load the JSON data file.
fn load_data(ctx: &PipelineContext) -> Result<Value, TemplateError> {
    let data_path = ctx.src_dir().join(&ctx.config().templates.data);
    if !data_path.is_file() {
        return Err(TemplateError::MissingData(data_path));
    }

    let contents = std::fs::read_to_string(&data_path)
        .map_err(|e| TemplateError::Io { file: data_path.clone(), source: e })?;
    serde_json::from_str(&contents)
        .map_err(|e| TemplateError::DataParse { file: data_path, source: e })
}

/// Expand `{% include %}` directives until none remain.
fn expand_includes(
    source: &str,
    page: &Path,
    include_dirs: &[PathBuf],
) -> Result<String, TemplateError> {
    let mut current = source.to_string();

    for _ in 0..MAX_INCLUDE_DEPTH {
        if !include_re().is_match(&current) {
            return Ok(current);
        }

        let mut next = String::with_capacity(current.len());
        let mut last_end = 0;
        for captures in include_re().captures_iter(&current) {
            let whole = captures.get(0).unwrap();
            let name = &captures[1];

            next.push_str(&current[last_end..whole.start()]);
            last_end = whole.end();

            let included = resolve_include(name, include_dirs).ok_or_else(|| {
                TemplateError::MissingInclude {
                    page: page.to_path_buf(),
                    include: name.to_string(),
                }
            })?;
            let contents = std::fs::read_to_string(&included)
                .map_err(|e| TemplateError::Io { file: included.clone(), source: e })?;
            next.push_str(&contents);
        }
        next.push_str(&current[last_end..]);
        current = next;
    }

    if include_re().is_match(&current) {
        return Err(TemplateError::IncludeDepth { page: page.to_path_buf() });
    }
    Ok(current)
}

/// Find an include file in the lookup directories.
fn resolve_include(name: &str, include_dirs: &[PathBuf]) -> Option<PathBuf> {
    for dir in include_dirs {
        let mut candidate = dir.join(name);
        if candidate.extension().is_none() {
            candidate.set_extension("html");
        }
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Substitute `{{ key }}` placeholders from the data value.
fn substitute_vars(source: &str, page: &Path, data: &Value) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(source.len());
    let mut last_end = 0;

    for captures in var_re().captures_iter(source) {
        let whole = captures.get(0).unwrap();
        let key = &captures[1];

        result.push_str(&source[last_end..whole.start()]);
        last_end = whole.end();

        let value = lookup(data, key).ok_or_else(|| TemplateError::UnknownKey {
            page: page.to_path_buf(),
            key: key.to_string(),
        })?;

        match value {
            Value::String(s) => result.push_str(s),
            Value::Number(n) => result.push_str(&n.to_string()),
            Value::Bool(b) => result.push_str(if *b { "true" } else { "false" }),
            _ => {
                return Err(TemplateError::NonScalarKey {
                    page: page.to_path_buf(),
                    key: key.to_string(),
                })
            }
        }
    }

    result.push_str(&source[last_end..]);
    Ok(result)
}

/// Walk a dotted key path through nested objects.
fn lookup<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    let mut current = data;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

/// The static (glob-free) leading portion of a pattern.
///
/// `pages/**/*.html` -> `pages`; used to re-root rendered output.
fn glob_static_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    for part in Path::new(pattern).components() {
        let s = part.as_os_str().to_string_lossy();
        if s.contains('*') || s.contains('?') || s.contains('[') {
            break;
        }
        prefix.push(part);
    }
    prefix
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

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_render_substitutes_data() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());
        write(
            &temp.path().join("src/templates/data.json"),
            r#"{"title": "Home", "site": {"name": "Acme"}}"#,
        );
        write(
            &temp.path().join("src/pages/index.html"),
            "<h1>{{ title }}</h1><p>{{ site.name }}</p>",
        );

        let outputs = render_pages(&ctx).unwrap();
        assert_eq!(outputs, vec![temp.path().join("src/index.html")]);
        let rendered = fs::read_to_string(&outputs[0]).unwrap();
        assert_eq!(rendered, "<h1>Home</h1><p>Acme</p>");
    }

    #[test]
    fn test_render_resolves_includes_from_templates_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());
        write(&temp.path().join("src/templates/data.json"), "{}");
        write(&temp.path().join("src/templates/header.html"), "<header>hi</header>");
        write(
            &temp.path().join("src/pages/index.html"),
            "{% include \"header\" %}<main></main>",
        );

        let outputs = render_pages(&ctx).unwrap();
        let rendered = fs::read_to_string(&outputs[0]).unwrap();
        assert_eq!(rendered, "<header>hi</header><main></main>");
    }

    #[test]
    fn test_render_prefers_wired_template_in_temp() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());
        write(&temp.path().join("src/templates/data.json"), "{}");
        write(&temp.path().join("src/templates/base.html"), "source-base");
        write(&temp.path().join(".tmp/templates/base.html"), "wired-base");
        write(&temp.path().join("src/pages/index.html"), "{% include \"base.html\" %}");

        let outputs = render_pages(&ctx).unwrap();
        let rendered = fs::read_to_string(&outputs[0]).unwrap();
        assert_eq!(rendered, "wired-base");
    }

    #[test]
    fn test_render_nested_includes() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());
        write(&temp.path().join("src/templates/data.json"), r#"{"name": "x"}"#);
        write(&temp.path().join("src/templates/inner.html"), "{{ name }}");
        write(&temp.path().join("src/templates/outer.html"), "[{% include \"inner\" %}]");
        write(&temp.path().join("src/pages/index.html"), "{% include \"outer\" %}");

        let outputs = render_pages(&ctx).unwrap();
        let rendered = fs::read_to_string(&outputs[0]).unwrap();
        assert_eq!(rendered, "[x]");
    }

    #[test]
    fn test_render_missing_include_names_page() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());
        write(&temp.path().join("src/templates/data.json"), "{}");
        write(&temp.path().join("src/pages/index.html"), "{% include \"ghost\" %}");

        let err = render_pages(&ctx).unwrap_err();
        match err {
            TemplateError::MissingInclude { page, include } => {
                assert!(page.ends_with("index.html"));
                assert_eq!(include, "ghost");
            }
            other => panic!("expected MissingInclude, got {:?}", other),
        }
    }

    #[test]
    fn test_render_include_cycle_hits_depth_limit() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());
        write(&temp.path().join("src/templates/data.json"), "{}");
        write(&temp.path().join("src/templates/a.html"), "{% include \"b\" %}");
        write(&temp.path().join("src/templates/b.html"), "{% include \"a\" %}");
        write(&temp.path().join("src/pages/index.html"), "{% include \"a\" %}");

        let err = render_pages(&ctx).unwrap_err();
        assert!(matches!(err, TemplateError::IncludeDepth { .. }));
    }

    #[test]
    fn test_render_unknown_key() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());
        write(&temp.path().join("src/templates/data.json"), "{}");
        write(&temp.path().join("src/pages/index.html"), "{{ missing }}");

        let err = render_pages(&ctx).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownKey { .. }));
    }

    #[test]
    fn test_render_missing_data_file() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());
        write(&temp.path().join("src/pages/index.html"), "static");

        let err = render_pages(&ctx).unwrap_err();
        assert!(matches!(err, TemplateError::MissingData(_)));
    }

    #[test]
    fn test_glob_static_prefix() {
        assert_eq!(glob_static_prefix("pages/**/*.html"), PathBuf::from("pages"));
        assert_eq!(glob_static_prefix("**/*.html"), PathBuf::new());
        assert_eq!(glob_static_prefix("a/b/*.html"), PathBuf::from("a/b"));
    }

    #[test]
    fn test_render_preserves_subdirectories() {
        let temp = TempDir::new().unwrap();
        let ctx = test_ctx(temp.path());
        write(&temp.path().join("src/templates/data.json"), "{}");
        write(&temp.path().join("src/pages/docs/intro.html"), "docs");

        let outputs = render_pages(&ctx).unwrap();
        assert_eq!(outputs, vec![temp.path().join("src/docs/intro.html")]);
    }
}
