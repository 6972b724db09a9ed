//! Task graph pipeline for sitesmith
//!
//! The pipeline turns the static task registry into an ordered run:
//! - **Registry**: the named tasks and their dependency edges
//! - **Plan**: cycle/unknown-name checking and topological ordering
//! - **Execution**: sequential or wave-parallel, with the skip-on-failure
//!   policy shared between both executors

pub mod context;
pub mod executor;
pub mod parallel;
pub mod registry;
pub mod result;
pub mod task;

pub use context::*;
pub use executor::*;
pub use parallel::*;
pub use registry::*;
pub use result::*;
pub use task::*;
