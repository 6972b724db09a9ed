//! Configuration for sitesmith projects

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
