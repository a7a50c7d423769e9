//! Build pipeline module for sassbuild
//!
//! Turns the `.scss` entries of a project into published `.css` files.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Discovery**: Find entry style sheets under the source root
//! - **Compilation**: Expand wildcard imports and compile with grass
//! - **Rewriting**: Point local asset `url(...)` references at published URLs
//! - **Writing**: Replace each output file atomically
//!
//! # Example
//!
//! ```ignore
//! use sassbuild::build::{BuildContext, BuildPipeline};
//! use sassbuild::config::load_config;
//!
//! let loaded = load_config(None, &cwd)?;
//! let context = BuildContext::from_config(&loaded.config, &loaded.project_root)?;
//! let report = BuildPipeline::new(context).build()?;
//! println!("{}", report.summary());
//! ```

pub mod clean;
pub mod compiler;
pub mod context;
pub mod discovery;
pub mod globbing;
pub mod imports;
pub mod parallel;
pub mod pipeline;
pub mod result;
pub mod rewrite;
pub mod writer;

pub use clean::*;
pub use compiler::*;
pub use context::*;
pub use discovery::*;
pub use globbing::{DirectoryListing, FsListing, GlobError, GlobPattern, MemoryListing};
pub use imports::expand_glob_imports;
pub use parallel::*;
pub use pipeline::*;
pub use result::*;
pub use rewrite::*;
pub use writer::*;
