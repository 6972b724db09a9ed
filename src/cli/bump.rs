//! Bump command implementation

use std::path::Path;
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::bump::{bump_config_file, BumpKind};
use crate::config::find_config;

/// Run the bump command.
pub fn run_bump(config: Option<&Path>, kind: BumpKind, set: Option<&str>) -> ExitCode {
    let config_path = match config {
        Some(path) => path.to_path_buf(),
        None => match find_config() {
            Some(path) => path,
            None => {
                eprintln!("No sitesmith.toml found in this directory or any parent");
                return ExitCode::from(EXIT_ERROR);
            }
        },
    };

    let explicit = match set {
        Some(raw) => match semver::Version::parse(raw) {
            Ok(version) => Some(version),
            Err(e) => {
                eprintln!("Invalid version '{}': {}", raw, e);
                return ExitCode::from(EXIT_ERROR);
            }
        },
        None => None,
    };

    match bump_config_file(&config_path, kind, explicit) {
        Ok((old, new)) => {
            println!("Bumped {}: {} -> {}", config_path.display(), old, new);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
