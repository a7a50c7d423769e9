//! Build context containing the resolved paths and options for a build.

use crate::config::{resolve, BuildOptions, ConfigError, PathConfig, SassConfig};
use std::path::{Path, PathBuf};

/// Build context containing configuration and paths for a build operation.
///
/// The context is constructed once per build and shared by reference with
/// every stage and worker thread; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Resolved absolute paths and URL prefixes
    paths: PathConfig,
    /// Compilation switches
    options: BuildOptions,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl BuildContext {
    /// Create a new build context from an already-resolved path table.
    pub fn new(paths: PathConfig, options: BuildOptions) -> Self {
        Self { paths, options, verbose: false }
    }

    /// Resolve a configuration relative to `project_root` and build a context.
    pub fn from_config(config: &SassConfig, project_root: &Path) -> Result<Self, ConfigError> {
        let (paths, options) = resolve(config, project_root)?;
        Ok(Self::new(paths, options))
    }

    /// Get the path table.
    pub fn paths(&self) -> &PathConfig {
        &self.paths
    }

    /// Get the build options.
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Get the style-sheet source directory.
    pub fn src_dir(&self) -> &Path {
        &self.paths.source_style_root
    }

    /// Get the output directory.
    pub fn out_dir(&self) -> &Path {
        &self.paths.output_style_root
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Directories the compiler searches for an entry's imports, in order:
    /// the entry's own directory, the source root, then configured paths.
    pub fn load_paths_for(&self, source: &Path) -> Vec<PathBuf> {
        let mut load_paths = Vec::with_capacity(self.paths.import_paths.len() + 2);
        if let Some(parent) = source.parent() {
            load_paths.push(parent.to_path_buf());
        }
        if !load_paths.iter().any(|p| p == &self.paths.source_style_root) {
            load_paths.push(self.paths.source_style_root.clone());
        }
        load_paths.extend(self.paths.import_paths.iter().cloned());
        load_paths
    }
}
