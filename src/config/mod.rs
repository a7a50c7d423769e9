//! Configuration module for sassbuild
//!
//! Provides types and parsing for `sassbuild.toml` and Compass `config.rb`
//! project configuration, and the resolver that turns it into absolute paths.

pub mod loader;
pub mod paths;
pub mod ruby;
pub mod schema;

pub use loader::*;
pub use paths::*;
pub use schema::*;
