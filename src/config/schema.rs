//! Configuration schema types for `sitesmith.toml`
//!
//! Defines the structure and validation rules for sitesmith project
//! configuration. Every recognized option is an explicit field with an
//! explicit default; nothing is merged dynamically at runtime.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Project metadata and directory layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required)
    pub name: String,
    /// Project version
    #[serde(default = "default_version")]
    pub version: String,
    /// Source directory containing styles, templates, pages, fonts, images
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Temp directory for intermediate compiled artifacts
    #[serde(default = "default_temp")]
    pub temp: PathBuf,
    /// Build output directory
    #[serde(default = "default_build")]
    pub build: PathBuf,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_temp() -> PathBuf {
    PathBuf::from(".tmp")
}

fn default_build() -> PathBuf {
    PathBuf::from("build")
}

/// Stylesheet compilation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    /// Entry stylesheets, relative to the source directory.
    /// Each entry is compiled to `<temp>/<stem>.css`.
    #[serde(default = "default_style_entries")]
    pub entries: Vec<String>,
    /// Glob (relative to src) that triggers a style rebuild in watch mode
    #[serde(default = "default_style_watch")]
    pub watch: String,
    /// Browserslist-style targets used for vendor prefixing
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            entries: default_style_entries(),
            watch: default_style_watch(),
            browsers: default_browsers(),
        }
    }
}

fn default_style_entries() -> Vec<String> {
    vec!["styles/main.css".to_string()]
}

fn default_style_watch() -> String {
    "styles/**/*.css".to_string()
}

fn default_browsers() -> Vec<String> {
    vec!["last 3 versions".to_string(), "> 5%".to_string()]
}

/// Font copy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontsConfig {
    /// Globs (relative to src) for font files copied into `<build>/fonts`
    #[serde(default = "default_font_sources")]
    pub sources: Vec<String>,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self { sources: default_font_sources() }
    }
}

fn default_font_sources() -> Vec<String> {
    vec!["fonts/**/*".to_string()]
}

/// Image copy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Globs (relative to src) for image files copied into `<build>/images`
    #[serde(default = "default_image_sources")]
    pub sources: Vec<String>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { sources: default_image_sources() }
    }
}

fn default_image_sources() -> Vec<String> {
    vec!["images/**/*".to_string()]
}

/// Application script settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Globs (relative to src) for app JS injected into the template
    #[serde(default = "default_script_sources")]
    pub sources: Vec<String>,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self { sources: default_script_sources() }
    }
}

fn default_script_sources() -> Vec<String> {
    vec!["js/**/*.js".to_string()]
}

/// Template rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Base template (relative to src) that carries the wiring markers
    #[serde(default = "default_template_base")]
    pub base: PathBuf,
    /// JSON data file (relative to src) supplying template variables
    #[serde(default = "default_template_data")]
    pub data: PathBuf,
    /// Globs (relative to src) for page templates rendered to final HTML
    #[serde(default = "default_template_pages")]
    pub pages: Vec<String>,
    /// Globs (relative to src) that trigger a template rebuild in watch mode
    #[serde(default = "default_template_views")]
    pub views: Vec<String>,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            base: default_template_base(),
            data: default_template_data(),
            pages: default_template_pages(),
            views: default_template_views(),
        }
    }
}

fn default_template_base() -> PathBuf {
    PathBuf::from("templates/base.html")
}

fn default_template_data() -> PathBuf {
    PathBuf::from("templates/data.json")
}

fn default_template_pages() -> Vec<String> {
    vec!["pages/**/*.html".to_string()]
}

fn default_template_views() -> Vec<String> {
    vec!["templates/**/*.html".to_string(), "pages/**/*.html".to_string()]
}

/// One third-party library wired into the template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorLibrary {
    /// Library name, used in diagnostics
    pub name: String,
    /// Files (relative to the vendor directory) in wiring order
    pub files: Vec<String>,
}

/// Third-party dependency settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    /// Vendor directory, relative to the project root
    #[serde(default = "default_vendor_dir")]
    pub dir: PathBuf,
    /// Libraries in wiring order
    #[serde(default)]
    pub libraries: Vec<VendorLibrary>,
    /// Vendor files excluded from wiring (relative to the vendor directory)
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self { dir: default_vendor_dir(), libraries: vec![], exclude: vec![] }
    }
}

fn default_vendor_dir() -> PathBuf {
    PathBuf::from("vendor")
}

/// Optimize task settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeConfig {
    /// Root HTML file (relative to src) scanned for build blocks
    #[serde(default = "default_index")]
    pub index: PathBuf,
    /// Prepend a project header comment to optimized assets
    #[serde(default = "default_true")]
    pub header: bool,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self { index: default_index(), header: true }
    }
}

fn default_index() -> PathBuf {
    PathBuf::from("index.html")
}

fn default_true() -> bool {
    true
}

/// CDN reference rewriting
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CdnConfig {
    /// Enable CDN rewriting during optimize
    #[serde(default)]
    pub enabled: bool,
    /// CDN base URL prepended to matched references
    #[serde(default)]
    pub base: String,
    /// Local reference paths eligible for CDN rewriting
    #[serde(default)]
    pub files: Vec<String>,
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    /// Local port to bind
    #[serde(default = "default_port")]
    pub port: u16,
    /// URL prefix -> directory rewrites (relative to the project root)
    #[serde(default = "default_routes")]
    pub routes: HashMap<String, PathBuf>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self { port: default_port(), routes: default_routes() }
    }
}

fn default_port() -> u16 {
    4000
}

fn default_routes() -> HashMap<String, PathBuf> {
    let mut routes = HashMap::new();
    routes.insert("/vendor".to_string(), PathBuf::from("vendor"));
    routes.insert("/.tmp".to_string(), PathBuf::from(".tmp"));
    routes
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce window in milliseconds; changes inside one window coalesce
    /// into a single rebuild and a single client notification
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

fn default_debounce_ms() -> u32 {
    300
}

/// Complete sitesmith.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Project metadata (required)
    pub project: ProjectConfig,
    /// Stylesheet settings
    #[serde(default)]
    pub styles: StylesConfig,
    /// Font settings
    #[serde(default)]
    pub fonts: FontsConfig,
    /// Image settings
    #[serde(default)]
    pub images: ImagesConfig,
    /// App script settings
    #[serde(default)]
    pub scripts: ScriptsConfig,
    /// Template settings
    #[serde(default)]
    pub templates: TemplatesConfig,
    /// Vendor dependency settings
    #[serde(default)]
    pub vendor: VendorConfig,
    /// Optimize settings
    #[serde(default)]
    pub optimize: OptimizeConfig,
    /// CDN settings
    #[serde(default)]
    pub cdn: CdnConfig,
    /// Dev server settings
    #[serde(default)]
    pub serve: ServeConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "styles.entries")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sitesmith.toml: '{}' {}", self.field, self.message)
    }
}

impl SiteConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.project.name.is_empty() {
            errors.push(ConfigValidationError {
                field: "project.name".to_string(),
                message: "must be a non-empty string".to_string(),
            });
        }

        if semver::Version::parse(&self.project.version).is_err() {
            errors.push(ConfigValidationError {
                field: "project.version".to_string(),
                message: format!("'{}' is not a valid semantic version", self.project.version),
            });
        }

        if self.styles.entries.is_empty() {
            errors.push(ConfigValidationError {
                field: "styles.entries".to_string(),
                message: "must contain at least one entry stylesheet".to_string(),
            });
        }

        // Globs are checked up front; a malformed pattern is a startup error,
        // not a mid-build failure.
        let glob_fields = [
            ("styles.watch", std::slice::from_ref(&self.styles.watch)),
            ("fonts.sources", self.fonts.sources.as_slice()),
            ("images.sources", self.images.sources.as_slice()),
            ("scripts.sources", self.scripts.sources.as_slice()),
            ("templates.pages", self.templates.pages.as_slice()),
            ("templates.views", self.templates.views.as_slice()),
        ];
        for (field, patterns) in glob_fields {
            for pattern in patterns {
                if let Err(e) = glob::Pattern::new(pattern) {
                    errors.push(ConfigValidationError {
                        field: field.to_string(),
                        message: format!("invalid glob pattern '{}': {}", pattern, e),
                    });
                }
            }
        }

        for library in &self.vendor.libraries {
            if library.name.is_empty() {
                errors.push(ConfigValidationError {
                    field: "vendor.libraries".to_string(),
                    message: "library name must be non-empty".to_string(),
                });
            }
            if library.files.is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("vendor.libraries.{}", library.name),
                    message: "must list at least one file".to_string(),
                });
            }
        }

        if self.cdn.enabled && self.cdn.base.is_empty() {
            errors.push(ConfigValidationError {
                field: "cdn.base".to_string(),
                message: "must be set when cdn.enabled is true".to_string(),
            });
        }

        if self.serve.port == 0 {
            errors.push(ConfigValidationError {
                field: "serve.port".to_string(),
                message: "must be a non-zero port".to_string(),
            });
        }

        if self.watch.debounce_ms == 0 {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: "must be a positive number of milliseconds".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Vendor files in wiring order, with exclusions applied.
    ///
    /// Paths are relative to the vendor directory.
    pub fn vendor_files(&self) -> Vec<String> {
        self.vendor
            .libraries
            .iter()
            .flat_map(|lib| lib.files.iter())
            .filter(|file| !self.vendor.exclude.iter().any(|ex| ex == *file))
            .cloned()
            .collect()
    }
}
