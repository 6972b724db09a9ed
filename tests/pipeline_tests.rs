//! End-to-end pipeline tests over a real project layout in a temp dir.

use sitesmith::assets::rev::RevManifest;
use sitesmith::config::SiteConfig;
use sitesmith::pipeline::{registry, PipelineContext, TaskExecutor, TaskStatus};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const BASE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<!-- wiredep:css -->
<!-- endwiredep -->
<!-- inject:css -->
<!-- endinject -->
</head>
<body>
<main>{{ title }}</main>
<!-- wiredep:js -->
<!-- endwiredep -->
<!-- inject:js -->
<!-- endinject -->
</body>
</html>
"#;

const INDEX: &str = r#"<!DOCTYPE html>
<html>
<head>
<!-- build:css styles/app.css -->
<link rel="stylesheet" href="/.tmp/main.css">
<!-- endbuild -->
</head>
<body>
<!-- build:js js/lib.js -->
<script src="/vendor/jquery/jquery.js"></script>
<!-- endbuild -->
<!-- build:js js/app.js -->
<script src="/js/app.js"></script>
<!-- endbuild -->
</body>
</html>
"#;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Lay out a complete project under a temp root.
fn setup_project(root: &Path) {
    write(&root.join("src/index.html"), INDEX);
    write(&root.join("src/templates/base.html"), BASE_TEMPLATE);
    write(&root.join("src/templates/data.json"), r#"{"title": "Hello"}"#);
    write(
        &root.join("src/pages/about.html"),
        "{% include \"base.html\" %}",
    );
    write(
        &root.join("src/styles/main.css"),
        "@import \"colors.css\";\n.app { display: flex; }\n",
    );
    write(&root.join("src/styles/colors.css"), ".accent { color: teal; }\n");
    write(&root.join("src/js/app.js"), "// app entry\nvar app = {};\n");
    write(&root.join("src/fonts/site.woff2"), "woff2");
    write(&root.join("src/images/logo.png"), "png-bytes");
    write(&root.join("vendor/jquery/jquery.js"), "var jQuery = {};\n");
}

fn context(root: &Path) -> PipelineContext {
    let config: SiteConfig = toml::from_str(
        r#"
[project]
name = "fixture"
version = "1.0.0"

[styles]
entries = ["styles/main.css"]
browsers = []

[[vendor.libraries]]
name = "jquery"
files = ["jquery/jquery.js"]
"#,
    )
    .unwrap();
    PipelineContext::new(config, root.to_path_buf())
}

#[test]
fn build_produces_complete_output_directory() {
    let temp = TempDir::new().unwrap();
    setup_project(temp.path());
    let ctx = context(temp.path());

    let plan = registry::create_task_plan();
    let result = TaskExecutor::new(ctx).run(&plan, registry::BUILD).unwrap();
    assert!(result.is_success(), "{}", result.summary());

    let build = temp.path().join("build");
    assert!(build.join("index.html").is_file());
    assert!(build.join("fonts/site.woff2").is_file());
    assert!(build.join("images/logo.png").is_file());
    assert!(build.join("rev-manifest.json").is_file());

    // Fingerprinted assets exist and the HTML references them
    let manifest = RevManifest::load_from_dir(&build).unwrap().unwrap();
    let css_name = manifest.get("styles/app.css").unwrap();
    let lib_name = manifest.get("js/lib.js").unwrap();
    let app_name = manifest.get("js/app.js").unwrap();
    assert!(build.join(css_name).is_file());
    assert!(build.join(lib_name).is_file());
    assert!(build.join(app_name).is_file());

    let html = fs::read_to_string(build.join("index.html")).unwrap();
    assert!(html.contains(css_name));
    assert!(html.contains(lib_name));
    assert!(html.contains(app_name));
    assert!(!html.contains("/.tmp/main.css"));

    // The temp directory was discarded after the successful build
    assert!(!temp.path().join(".tmp").exists());
}

#[test]
fn build_runs_each_task_once_in_dependency_order() {
    let temp = TempDir::new().unwrap();
    setup_project(temp.path());
    let ctx = context(temp.path());

    let plan = registry::create_task_plan();
    let result = TaskExecutor::new(ctx).run(&plan, registry::BUILD).unwrap();

    // Each task appears exactly once
    let mut names: Vec<&str> = result.tasks.iter().map(|t| t.task.as_str()).collect();
    let total = names.len();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), total);

    // Dependencies precede their dependents
    let pos = |name: &str| result.tasks.iter().position(|t| t.task == name).unwrap();
    assert!(pos(registry::CLEAN_STYLES) < pos(registry::STYLES));
    assert!(pos(registry::STYLES) < pos(registry::INJECT));
    assert!(pos(registry::WIREDEP) < pos(registry::INJECT));
    assert!(pos(registry::INJECT) < pos(registry::OPTIMIZE));
    assert!(pos(registry::OPTIMIZE) < pos(registry::BUILD));
}

#[test]
fn rebuild_of_unchanged_sources_reproduces_fingerprints() {
    let temp = TempDir::new().unwrap();
    setup_project(temp.path());
    let ctx = context(temp.path());
    let plan = registry::create_task_plan();

    let result = TaskExecutor::new(ctx.clone()).run(&plan, registry::BUILD).unwrap();
    assert!(result.is_success(), "{}", result.summary());
    let first = RevManifest::load_from_dir(&temp.path().join("build")).unwrap().unwrap();

    let result = TaskExecutor::new(ctx).run(&plan, registry::BUILD).unwrap();
    assert!(result.is_success(), "{}", result.summary());
    let second = RevManifest::load_from_dir(&temp.path().join("build")).unwrap().unwrap();

    assert_eq!(first.get("styles/app.css"), second.get("styles/app.css"));
    assert_eq!(first.get("js/lib.js"), second.get("js/lib.js"));
    assert_eq!(first.get("js/app.js"), second.get("js/app.js"));
}

#[test]
fn clean_then_build_leaves_no_stale_outputs() {
    let temp = TempDir::new().unwrap();
    setup_project(temp.path());
    let ctx = context(temp.path());
    let plan = registry::create_task_plan();

    let result = TaskExecutor::new(ctx.clone()).run(&plan, registry::BUILD).unwrap();
    assert!(result.is_success(), "{}", result.summary());
    assert!(temp.path().join("build/images/logo.png").is_file());

    // Rename a source image, then clean + build
    fs::rename(
        temp.path().join("src/images/logo.png"),
        temp.path().join("src/images/icon.png"),
    )
    .unwrap();

    let result = TaskExecutor::new(ctx.clone()).run(&plan, registry::CLEAN).unwrap();
    assert!(result.is_success(), "{}", result.summary());
    let result = TaskExecutor::new(ctx).run(&plan, registry::BUILD).unwrap();
    assert!(result.is_success(), "{}", result.summary());

    assert!(!temp.path().join("build/images/logo.png").exists());
    assert!(temp.path().join("build/images/icon.png").is_file());
}

#[test]
fn failed_styles_halts_dependents_but_not_asset_copies() {
    let temp = TempDir::new().unwrap();
    setup_project(temp.path());
    // Break the stylesheet entry
    fs::remove_file(temp.path().join("src/styles/main.css")).unwrap();
    let ctx = context(temp.path());

    let plan = registry::create_task_plan();
    let result = TaskExecutor::new(ctx).run(&plan, registry::BUILD).unwrap();
    assert!(!result.is_success());

    assert!(result.task(registry::STYLES).unwrap().status.is_failure());
    assert_eq!(result.task(registry::INJECT).unwrap().status, TaskStatus::Skipped);
    assert_eq!(result.task(registry::OPTIMIZE).unwrap().status, TaskStatus::Skipped);
    assert_eq!(result.task(registry::BUILD).unwrap().status, TaskStatus::Skipped);

    // Independent branches still completed
    assert_eq!(result.task(registry::FONTS).unwrap().status, TaskStatus::Success);
    assert_eq!(result.task(registry::IMAGES).unwrap().status, TaskStatus::Success);
    assert!(temp.path().join("build/fonts/site.woff2").is_file());
}

#[test]
fn templates_render_pages_against_wired_base() {
    let temp = TempDir::new().unwrap();
    setup_project(temp.path());
    let ctx = context(temp.path());

    let plan = registry::create_task_plan();
    let result = TaskExecutor::new(ctx).run(&plan, registry::TEMPLATES).unwrap();
    assert!(result.is_success(), "{}", result.summary());

    let rendered = fs::read_to_string(temp.path().join("src/about.html")).unwrap();
    // Data substitution happened
    assert!(rendered.contains("<main>Hello</main>"));
    // The wired base carried the vendor script and the compiled CSS
    assert!(rendered.contains("/vendor/jquery/jquery.js"));
    assert!(rendered.contains("/.tmp/main.css"));
    // Markers were consumed, not echoed
    assert!(!rendered.contains("{{ title }}"));
}

#[test]
fn unknown_task_fails_before_running_anything() {
    let temp = TempDir::new().unwrap();
    setup_project(temp.path());
    let ctx = context(temp.path());

    let plan = registry::create_task_plan();
    let err = TaskExecutor::new(ctx).run(&plan, "deploy").unwrap_err();
    assert_eq!(err.to_string(), "Unknown task 'deploy'");

    // Nothing was created
    assert!(!temp.path().join("build").exists());
    assert!(!temp.path().join(".tmp").exists());
}
