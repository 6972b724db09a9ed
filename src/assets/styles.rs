//! Stylesheet compilation.
//!
//! Each configured entry stylesheet is compiled to `<temp>/<stem>.css`:
//! local `@import` directives are inlined textually (relative to the
//! importing file), then the result is parsed and re-emitted with vendor
//! prefixes for the configured browser targets. Minification happens later,
//! in the optimize task; the temp output stays readable for dev serving.

use crate::pipeline::context::PipelineContext;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Error during stylesheet compilation
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StyleError {
    /// A configured entry stylesheet does not exist
    #[error("Entry stylesheet not found: {0}")]
    MissingEntry(PathBuf),
    /// An imported stylesheet does not exist
    #[error("{importer}: imported stylesheet not found: {imported}")]
    MissingImport { importer: PathBuf, imported: PathBuf },
    /// Imports form a cycle
    #[error("Import cycle detected at {0}")]
    ImportCycle(PathBuf),
    /// CSS syntax error
    #[error("{file}: {message}")]
    Parse { file: PathBuf, message: String },
    /// Invalid browser target list in config
    #[error("Invalid browser targets: {0}")]
    BrowserTargets(String),
    /// File I/O error
    #[error("{file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*@import\s+(?:url\()?["']([^"']+)["']\)?\s*;"#).unwrap()
    })
}

/// Compile all configured entry stylesheets into the temp directory.
pub fn compile_styles(ctx: &PipelineContext) -> Result<Vec<PathBuf>, StyleError> {
    let src_dir = ctx.src_dir();
    let temp_dir = ctx.temp_dir();

    std::fs::create_dir_all(&temp_dir)
        .map_err(|e| StyleError::Io { file: temp_dir.clone(), source: e })?;

    let browsers = browser_targets(&ctx.config().styles.browsers)?;

    let mut outputs = Vec::new();
    for entry in &ctx.config().styles.entries {
        let entry_path = src_dir.join(entry);
        if !entry_path.is_file() {
            return Err(StyleError::MissingEntry(entry_path));
        }

        if ctx.is_verbose() {
            println!("Compiling: {}", entry_path.display());
        }

        let mut visited = HashSet::new();
        let combined = inline_imports(&entry_path, &mut visited)?;
        let compiled = prefix_css(&combined, &entry_path, browsers)?;

        let stem = entry_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("styles")
            .to_string();
        let out_path = temp_dir.join(format!("{}.css", stem));
        std::fs::write(&out_path, compiled)
            .map_err(|e| StyleError::Io { file: out_path.clone(), source: e })?;
        outputs.push(out_path);
    }

    Ok(outputs)
}

/// Parse the configured browserslist queries.
pub fn browser_targets(queries: &[String]) -> Result<Option<Browsers>, StyleError> {
    if queries.is_empty() {
        return Ok(None);
    }
    Browsers::from_browserslist(queries.iter().map(|q| q.as_str()))
        .map_err(|e| StyleError::BrowserTargets(e.to_string()))
}

/// Recursively inline local `@import` directives.
///
/// Remote imports (http/https/protocol-relative) are left untouched.
/// Imports are resolved relative to the importing file; a `.css` extension
/// is appended when the reference has none.
pub fn inline_imports(
    path: &Path,
    visited: &mut HashSet<PathBuf>,
) -> Result<String, StyleError> {
    if !visited.insert(path.to_path_buf()) {
        return Err(StyleError::ImportCycle(path.to_path_buf()));
    }

    let source = std::fs::read_to_string(path)
        .map_err(|e| StyleError::Io { file: path.to_path_buf(), source: e })?;
    let dir = path.parent().unwrap_or(Path::new("."));

    let mut result = String::with_capacity(source.len());
    let mut last_end = 0;

    for captures in import_re().captures_iter(&source) {
        let whole = captures.get(0).unwrap();
        let target = &captures[1];

        result.push_str(&source[last_end..whole.start()]);
        last_end = whole.end();

        if target.starts_with("http://")
            || target.starts_with("https://")
            || target.starts_with("//")
        {
            result.push_str(whole.as_str());
            continue;
        }

        let mut import_path = dir.join(target);
        if import_path.extension().is_none() {
            import_path.set_extension("css");
        }

        if !import_path.is_file() {
            return Err(StyleError::MissingImport {
                importer: path.to_path_buf(),
                imported: import_path,
            });
        }

        let inlined = inline_imports(&import_path, visited)?;
        result.push_str(&inlined);
    }

    result.push_str(&source[last_end..]);
    visited.remove(path);
    Ok(result)
}

/// Run CSS through the parser and re-emit it with vendor prefixes.
fn prefix_css(
    css: &str,
    file: &Path,
    browsers: Option<Browsers>,
) -> Result<String, StyleError> {
    let options = ParserOptions {
        filename: file.display().to_string(),
        ..ParserOptions::default()
    };

    let mut sheet = StyleSheet::parse(css, options)
        .map_err(|e| StyleError::Parse { file: file.to_path_buf(), message: e.to_string() })?;

    let targets = Targets::from(browsers.unwrap_or_default());
    sheet
        .minify(MinifyOptions { targets, ..MinifyOptions::default() })
        .map_err(|e| StyleError::Parse { file: file.to_path_buf(), message: e.to_string() })?;

    let output = sheet
        .to_css(PrinterOptions { minify: false, targets, ..PrinterOptions::default() })
        .map_err(|e| StyleError::Parse { file: file.to_path_buf(), message: e.to_string() })?;

    Ok(output.code)
}

/// Minify a CSS string, used by the optimize task.
pub fn minify_css(
    css: &str,
    file: &Path,
    browsers: Option<Browsers>,
) -> Result<String, StyleError> {
    let options = ParserOptions {
        filename: file.display().to_string(),
        ..ParserOptions::default()
    };

    let mut sheet = StyleSheet::parse(css, options)
        .map_err(|e| StyleError::Parse { file: file.to_path_buf(), message: e.to_string() })?;

    let targets = Targets::from(browsers.unwrap_or_default());
    sheet
        .minify(MinifyOptions { targets, ..MinifyOptions::default() })
        .map_err(|e| StyleError::Parse { file: file.to_path_buf(), message: e.to_string() })?;

    let output = sheet
        .to_css(PrinterOptions { minify: true, targets, ..PrinterOptions::default() })
        .map_err(|e| StyleError::Parse { file: file.to_path_buf(), message: e.to_string() })?;

    Ok(output.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_ctx(root: &Path, entries: &[&str]) -> PipelineContext {
        let entries_toml = entries
            .iter()
            .map(|e| format!("\"{}\"", e))
            .collect::<Vec<_>>()
            .join(", ");
        let toml = format!(
            "[project]\nname = \"test\"\n\n[styles]\nentries = [{}]\nbrowsers = []\n",
            entries_toml
        );
        let config = toml::from_str(&toml).unwrap();
        PipelineContext::new(config, root.to_path_buf())
    }

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_inline_imports_flat() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("base.css"), ".base { color: red; }\n");
        write(
            &temp.path().join("main.css"),
            "@import \"base.css\";\n.main { color: blue; }\n",
        );

        let mut visited = HashSet::new();
        let combined = inline_imports(&temp.path().join("main.css"), &mut visited).unwrap();
        assert!(combined.contains(".base"));
        assert!(combined.contains(".main"));
        assert!(!combined.contains("@import"));
    }

    #[test]
    fn test_inline_imports_nested_and_extensionless() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("parts/colors.css"), ".c { color: teal; }\n");
        write(&temp.path().join("parts/all.css"), "@import 'colors';\n");
        write(&temp.path().join("main.css"), "@import \"parts/all.css\";\n");

        let mut visited = HashSet::new();
        let combined = inline_imports(&temp.path().join("main.css"), &mut visited).unwrap();
        assert!(combined.contains(".c"));
    }

    #[test]
    fn test_inline_imports_leaves_remote_urls() {
        let temp = TempDir::new().unwrap();
        write(
            &temp.path().join("main.css"),
            "@import \"https://fonts.example.com/font.css\";\n.m {}\n",
        );

        let mut visited = HashSet::new();
        let combined = inline_imports(&temp.path().join("main.css"), &mut visited).unwrap();
        assert!(combined.contains("@import \"https://fonts.example.com/font.css\""));
    }

    #[test]
    fn test_inline_imports_cycle_detected() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("a.css"), "@import \"b.css\";\n");
        write(&temp.path().join("b.css"), "@import \"a.css\";\n");

        let mut visited = HashSet::new();
        let err = inline_imports(&temp.path().join("a.css"), &mut visited).unwrap_err();
        assert!(matches!(err, StyleError::ImportCycle(_)));
    }

    #[test]
    fn test_inline_imports_missing_import_names_importer() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("main.css"), "@import \"ghost.css\";\n");

        let mut visited = HashSet::new();
        let err = inline_imports(&temp.path().join("main.css"), &mut visited).unwrap_err();
        match err {
            StyleError::MissingImport { importer, imported } => {
                assert!(importer.ends_with("main.css"));
                assert!(imported.ends_with("ghost.css"));
            }
            other => panic!("expected MissingImport, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_styles_writes_to_temp() {
        let temp = TempDir::new().unwrap();
        write(
            &temp.path().join("src/styles/main.css"),
            "@import \"colors.css\";\n.app { display: flex; }\n",
        );
        write(&temp.path().join("src/styles/colors.css"), ".red { color: red; }\n");

        let ctx = test_ctx(temp.path(), &["styles/main.css"]);
        let outputs = compile_styles(&ctx).unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0], temp.path().join(".tmp/main.css"));
        let compiled = fs::read_to_string(&outputs[0]).unwrap();
        assert!(compiled.contains(".red"));
        assert!(compiled.contains(".app"));
    }

    #[test]
    fn test_compile_styles_missing_entry() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();

        let ctx = test_ctx(temp.path(), &["styles/absent.css"]);
        let err = compile_styles(&ctx).unwrap_err();
        assert!(matches!(err, StyleError::MissingEntry(_)));
    }

    #[test]
    fn test_minify_css_shrinks_output() {
        let source = ".a {\n  color: red;\n}\n";
        let minified = minify_css(source, Path::new("test.css"), None).unwrap();
        assert!(minified.len() < source.len());
        assert!(minified.contains(".a"));
    }

    #[test]
    fn test_browser_targets_empty_is_none() {
        assert!(browser_targets(&[]).unwrap().is_none());
    }

    #[test]
    fn test_browser_targets_invalid_query() {
        let err = browser_targets(&["definitely not a real query %%%".to_string()]);
        assert!(err.is_err());
    }
}
