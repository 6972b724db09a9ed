//! Version bumping for the project config.
//!
//! Rewrites the `version` field of the `[project]` section in
//! `sitesmith.toml` in place, leaving the rest of the user's formatting
//! untouched.

use regex::Regex;
use semver::{Prerelease, Version};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which part of the version to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BumpKind {
    /// x.y.Z
    Patch,
    /// x.Y.0
    Minor,
    /// X.0.0
    Major,
    /// x.y.z-N
    Pre,
}

/// Error during version bumping
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BumpError {
    /// The config file has no `[project]` section
    #[error("{0}: no [project] section found")]
    NoProjectSection(PathBuf),
    /// The current version does not parse
    #[error("Invalid version '{version}': {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },
    /// File I/O error
    #[error("{file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Compute the bumped version.
pub fn bump_version(version: &Version, kind: BumpKind) -> Version {
    match kind {
        BumpKind::Major => Version::new(version.major + 1, 0, 0),
        BumpKind::Minor => Version::new(version.major, version.minor + 1, 0),
        BumpKind::Patch => Version::new(version.major, version.minor, version.patch + 1),
        BumpKind::Pre => {
            if version.pre.is_empty() {
                let mut next =
                    Version::new(version.major, version.minor, version.patch + 1);
                next.pre = Prerelease::new("0").unwrap();
                next
            } else {
                // Increment the trailing numeric component: 1.2.3-rc.1 -> 1.2.3-rc.2
                let pre = version.pre.as_str();
                let bumped = match pre.rsplit_once('.') {
                    Some((head, tail)) => match tail.parse::<u64>() {
                        Ok(n) => format!("{}.{}", head, n + 1),
                        Err(_) => format!("{}.0", pre),
                    },
                    None => match pre.parse::<u64>() {
                        Ok(n) => (n + 1).to_string(),
                        Err(_) => format!("{}.0", pre),
                    },
                };
                let mut next = Version::new(version.major, version.minor, version.patch);
                next.pre = Prerelease::new(&bumped).unwrap_or_else(|_| version.pre.clone());
                next
            }
        }
    }
}

/// Bump the version field of a config file in place.
///
/// Returns the old and new versions. When `explicit` is given, it replaces
/// the version outright and `kind` is ignored.
pub fn bump_config_file(
    path: &Path,
    kind: BumpKind,
    explicit: Option<Version>,
) -> Result<(Version, Version), BumpError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| BumpError::Io { file: path.to_path_buf(), source: e })?;

    let (current, rewritten_template) = find_version_field(path, &contents)?;

    let next = match explicit {
        Some(version) => version,
        None => bump_version(&current, kind),
    };

    let rewritten = rewritten_template.replace("{{VERSION}}", &next.to_string());
    std::fs::write(path, rewritten)
        .map_err(|e| BumpError::Io { file: path.to_path_buf(), source: e })?;

    Ok((current, next))
}

/// Locate the `[project]` version field.
///
/// Returns the current version and the file contents with the version
/// replaced by a `{{VERSION}}` placeholder. A `[project]` section without
/// an explicit version field gets one inserted (the implied default is
/// 0.1.0).
fn find_version_field(path: &Path, contents: &str) -> Result<(Version, String), BumpError> {
    let section_re = Regex::new(r"(?m)^\[project\]\s*$").unwrap();
    let section = section_re
        .find(contents)
        .ok_or_else(|| BumpError::NoProjectSection(path.to_path_buf()))?;

    // The project section runs until the next section header
    let rest = &contents[section.end()..];
    let section_end = Regex::new(r"(?m)^\[")
        .unwrap()
        .find(rest)
        .map(|m| section.end() + m.start())
        .unwrap_or(contents.len());

    let version_re = Regex::new(r#"(?m)^(\s*version\s*=\s*")([^"]+)(")"#).unwrap();
    match version_re.captures(&contents[section.end()..section_end]) {
        Some(captures) => {
            let raw = captures[2].to_string();
            let current = Version::parse(&raw)
                .map_err(|e| BumpError::InvalidVersion { version: raw.clone(), source: e })?;

            let whole = captures.get(0).unwrap();
            let start = section.end() + whole.start();
            let end = section.end() + whole.end();
            let template = format!(
                "{}{}{{{{VERSION}}}}{}{}",
                &contents[..start],
                &captures[1],
                &captures[3],
                &contents[end..]
            );
            Ok((current, template))
        }
        None => {
            // No explicit field; insert one right after the section header
            let current = Version::new(0, 1, 0);
            let template = format!(
                "{}\nversion = \"{{{{VERSION}}}}\"{}",
                &contents[..section.end()],
                &contents[section.end()..]
            );
            Ok((current, template))
        }
    }
}
