//! Asset optimization for the root HTML.
//!
//! Reads the root HTML, extracts the assets referenced inside
//! `<!-- build:css dest --> ... <!-- endbuild -->` and
//! `<!-- build:js dest --> ... <!-- endbuild -->` blocks, concatenates and
//! minifies each group, fingerprints the result for cache busting, rewrites
//! the block to a single reference, applies CDN rewrites, and writes the
//! final HTML plus `rev-manifest.json` into the build directory.

use crate::assets::cdn::rewrite_cdn;
use crate::assets::rev::{fingerprinted_name, RevManifest};
use crate::assets::styles;
use crate::pipeline::context::PipelineContext;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Error during optimization.
#[derive(Debug)]
pub enum OptimizeError {
    /// The root HTML file does not exist
    MissingIndex(PathBuf),
    /// A referenced asset could not be resolved to a local file
    MissingAsset { reference: String, resolved: PathBuf },
    /// A referenced asset is not local (remote URLs cannot be concatenated)
    RemoteAsset(String),
    /// CSS minification error
    Css(String),
    /// IO error
    Io(PathBuf, std::io::Error),
}

impl std::fmt::Display for OptimizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimizeError::MissingIndex(path) => {
                write!(f, "Root HTML not found: {}", path.display())
            }
            OptimizeError::MissingAsset { reference, resolved } => {
                write!(f, "Referenced asset '{}' not found at {}", reference, resolved.display())
            }
            OptimizeError::RemoteAsset(reference) => {
                write!(f, "Remote reference '{}' cannot appear inside a build block", reference)
            }
            OptimizeError::Css(msg) => write!(f, "CSS error: {}", msg),
            OptimizeError::Io(path, err) => write!(f, "{}: {}", path.display(), err),
        }
    }
}

impl std::error::Error for OptimizeError {}

fn build_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<!--\s*build:(css|js)\s+(\S+)\s*-->(.*?)<!--\s*endbuild\s*-->")
            .unwrap()
    })
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?:href|src)\s*=\s*["']([^"']+)["']"#).unwrap())
}

/// Run the optimize task.
pub fn optimize(ctx: &PipelineContext) -> Result<Vec<PathBuf>, OptimizeError> {
    let src_dir = ctx.src_dir();
    let build_dir = ctx.build_dir();

    let index_path = src_dir.join(&ctx.config().optimize.index);
    if !index_path.is_file() {
        return Err(OptimizeError::MissingIndex(index_path));
    }

    if ctx.is_verbose() {
        println!("Optimizing {}", index_path.display());
    }

    let html = std::fs::read_to_string(&index_path)
        .map_err(|e| OptimizeError::Io(index_path.clone(), e))?;

    let browsers = styles::browser_targets(&ctx.config().styles.browsers)
        .map_err(|e| OptimizeError::Css(e.to_string()))?;

    std::fs::create_dir_all(&build_dir)
        .map_err(|e| OptimizeError::Io(build_dir.clone(), e))?;

    let mut manifest = RevManifest::new();
    let mut outputs = Vec::new();
    let mut result = String::with_capacity(html.len());
    let mut last_end = 0;

    for captures in build_block_re().captures_iter(&html) {
        let whole = captures.get(0).unwrap();
        let kind = &captures[1];
        let dest = &captures[2];
        let inner = &captures[3];

        result.push_str(&html[last_end..whole.start()]);
        last_end = whole.end();

        // Gather and concatenate the referenced sources in document order
        let mut concatenated = String::new();
        for ref_caps in reference_re().captures_iter(inner) {
            let reference = &ref_caps[1];
            let path = resolve_reference(ctx, reference)?;
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| OptimizeError::Io(path.clone(), e))?;
            concatenated.push_str(&contents);
            if !concatenated.ends_with('\n') {
                concatenated.push('\n');
            }
        }

        let minified = match kind {
            "css" => styles::minify_css(&concatenated, Path::new(dest), browsers)
                .map_err(|e| OptimizeError::Css(e.to_string()))?,
            _ => minify_js(&concatenated),
        };

        let finished = if ctx.config().optimize.header {
            format!("{}{}", file_header(ctx), minified)
        } else {
            minified
        };

        let final_name = fingerprinted_name(dest, finished.as_bytes());
        let out_path = build_dir.join(&final_name);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OptimizeError::Io(parent.to_path_buf(), e))?;
        }
        std::fs::write(&out_path, &finished)
            .map_err(|e| OptimizeError::Io(out_path.clone(), e))?;

        manifest.record(dest, final_name.as_str());
        let url = format!("/{}", final_name);
        result.push_str(&match kind {
            "css" => format!("<link rel=\"stylesheet\" href=\"{}\">", url),
            _ => format!("<script src=\"{}\"></script>", url),
        });
        outputs.push(out_path);
    }

    result.push_str(&html[last_end..]);

    let final_html = rewrite_cdn(&result, &ctx.config().cdn);

    let index_name = index_path.file_name().map(PathBuf::from).unwrap_or("index.html".into());
    let html_out = build_dir.join(index_name);
    std::fs::write(&html_out, final_html)
        .map_err(|e| OptimizeError::Io(html_out.clone(), e))?;
    outputs.push(html_out);

    let manifest_path = manifest
        .save_to_dir(&build_dir)
        .map_err(|e| OptimizeError::Io(build_dir.clone(), e))?;
    outputs.push(manifest_path);

    Ok(outputs)
}

/// Resolve a document reference to a local file.
///
/// Serve route rewrites are honored first (longest prefix wins), then
/// root-relative references are tried against the source dir and the
/// project root, then plain relative references against the source dir.
fn resolve_reference(ctx: &PipelineContext, reference: &str) -> Result<PathBuf, OptimizeError> {
    if reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("//")
    {
        return Err(OptimizeError::RemoteAsset(reference.to_string()));
    }

    // Ignore query strings and fragments
    let clean = reference.split(['?', '#']).next().unwrap_or(reference);

    let mut routes: Vec<(&String, &PathBuf)> = ctx.config().serve.routes.iter().collect();
    routes.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));

    for (prefix, dir) in routes {
        if let Some(rest) = clean.strip_prefix(prefix.as_str()) {
            // Prefixes match on path-segment boundaries only
            if !rest.is_empty() && !rest.starts_with('/') {
                continue;
            }
            let rest = rest.trim_start_matches('/');
            let candidate = ctx.resolve_path(dir).join(rest);
            return if candidate.is_file() {
                Ok(candidate)
            } else {
                Err(OptimizeError::MissingAsset {
                    reference: reference.to_string(),
                    resolved: candidate,
                })
            };
        }
    }

    let candidate = if let Some(rest) = clean.strip_prefix('/') {
        let in_src = ctx.src_dir().join(rest);
        if in_src.is_file() {
            in_src
        } else {
            ctx.project_root().join(rest)
        }
    } else {
        ctx.src_dir().join(clean)
    };

    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(OptimizeError::MissingAsset {
            reference: reference.to_string(),
            resolved: candidate,
        })
    }
}

/// Header comment prepended to optimized assets.
fn file_header(ctx: &PipelineContext) -> String {
    format!(
        "/*!\n * {} v{}\n */\n",
        ctx.config().project.name,
        ctx.config().project.version
    )
}

/// Strip comments and blank lines from JavaScript.
///
/// This is deliberately conservative: strings, template literals, and
/// regex literals are preserved verbatim, line structure is kept so
/// semicolon insertion is unaffected. It is not a JS parser.
pub fn minify_js(source: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Normal,
        Str(char),
        LineComment,
        BlockComment,
        Regex,
    }

    let mut out = String::with_capacity(source.len());
    let mut state = State::Normal;
    let mut chars = source.chars().peekable();
    // Last significant char decides whether '/' starts a regex literal
    let mut last_significant: Option<char> = None;

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                '"' | '\'' | '`' => {
                    state = State::Str(c);
                    out.push(c);
                    last_significant = Some(c);
                }
                '/' => match chars.peek() {
                    Some('/') => {
                        chars.next();
                        state = State::LineComment;
                    }
                    Some('*') => {
                        chars.next();
                        state = State::BlockComment;
                    }
                    _ => {
                        let regex_start = matches!(
                            last_significant,
                            None | Some(
                                '(' | ',' | '=' | ':' | '[' | '!' | '&' | '|' | '?' | '{'
                                    | '}' | ';' | '\n'
                            )
                        );
                        if regex_start {
                            state = State::Regex;
                        }
                        out.push(c);
                        last_significant = Some(c);
                    }
                },
                _ => {
                    out.push(c);
                    if !c.is_whitespace() {
                        last_significant = Some(c);
                    }
                }
            },
            State::Str(quote) => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == quote {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = State::Normal;
                    last_significant = Some('\n');
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Normal;
                }
            }
            State::Regex => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == '/' {
                    state = State::Normal;
                    last_significant = Some('/');
                } else if c == '\n' {
                    // Not actually a regex (division at line end); bail out
                    state = State::Normal;
                    last_significant = Some('\n');
                }
            }
        }
    }

    // Drop blank lines and trailing whitespace left by stripped comments
    let mut minified = String::with_capacity(out.len());
    for line in out.lines() {
        let trimmed = line.trim_end();
        if !trimmed.trim().is_empty() {
            minified.push_str(trimmed);
            minified.push('\n');
        }
    }
    minified
}
