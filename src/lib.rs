//! sassbuild - Build orchestration for Compass-style Sass projects
//!
//! This library provides functionality to:
//! - Load project configuration from `sassbuild.toml` or a Compass `config.rb`
//! - Discover entry style sheets and expand wildcard imports
//! - Compile them in parallel and publish the CSS with asset URLs rewritten

pub mod build;
pub mod cli;
pub mod config;
