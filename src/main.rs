//! Sitesmith - command-line asset pipeline for static front-end projects

use std::process::ExitCode;

use sitesmith::cli;

fn main() -> ExitCode {
    cli::run()
}
