//! Sitesmith - asset pipeline and dev server for static front-end projects
//!
//! This library provides:
//! - A task graph (registry + executor) ordering the asset pipeline
//! - Asset actions: stylesheet compile, copies, template wiring/rendering,
//!   optimization with content fingerprinting
//! - A debounced watch loop and an HTTP dev server with live reload

pub mod assets;
pub mod bump;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod serve;
pub mod watch;
