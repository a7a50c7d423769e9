//! Source file discovery for the build system.
//!
//! Finds the `.scss` entry points under the style-sheet root. Partials
//! (`_name.scss`) are only ever imported and never become entries.

use crate::build::globbing::{DirectoryListing, FsListing, GlobError, GlobPattern};
use crate::build::BuildContext;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Pattern for entries when globbing is enabled.
pub const RECURSIVE_ENTRY_PATTERN: &str = "**/*.scss";

/// Pattern for entries when globbing is disabled.
pub const TOP_LEVEL_ENTRY_PATTERN: &str = "*.scss";

/// Error during source discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The source root could not be listed
    #[error("Cannot read source directory '{}': {source}", .root.display())]
    UnreadableRoot {
        /// The style-sheet root
        root: PathBuf,
        /// Underlying error
        #[source]
        source: GlobError,
    },
    /// Invalid glob pattern
    #[error(transparent)]
    Pattern(GlobError),
}

/// One style sheet to compile.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entry {
    /// Path relative to the source root (the sort key)
    pub relative_path: PathBuf,
    /// Absolute source path
    pub source_path: PathBuf,
    /// Output path relative to the output root, with a `.css` extension
    pub relative_output_path: PathBuf,
}

impl Entry {
    /// Create an entry for `relative_path` under `root`.
    pub fn new(root: &Path, relative_path: PathBuf) -> Self {
        let relative_output_path = relative_path.with_extension("css");
        Self { source_path: root.join(&relative_path), relative_path, relative_output_path }
    }

    /// Display form of the relative source path, always with `/` separators.
    pub fn display_path(&self) -> String {
        crate::config::to_url_path(&self.relative_path)
    }
}

/// Check if a file name is a compilable style sheet (not a partial).
pub fn is_entry_name(name: &str) -> bool {
    name.ends_with(".scss") && !name.starts_with('_')
}

/// Discover entries for a build context on the real filesystem.
pub fn discover_entries(ctx: &BuildContext) -> Result<Vec<Entry>, DiscoveryError> {
    discover_entries_in(&FsListing, ctx.src_dir(), ctx.options().globbing_enabled)
}

/// Discover entries under `root` through any directory listing.
///
/// With `globbing` every non-partial `.scss` file below the root is an
/// entry; without it only the root's own top-level files are, and nested
/// files are reached through their explicit imports. The result is sorted
/// by relative path and contains each canonical file once.
pub fn discover_entries_in(
    listing: &dyn DirectoryListing,
    root: &Path,
    globbing: bool,
) -> Result<Vec<Entry>, DiscoveryError> {
    let pattern_text = if globbing { RECURSIVE_ENTRY_PATTERN } else { TOP_LEVEL_ENTRY_PATTERN };
    let pattern = GlobPattern::new(pattern_text).map_err(DiscoveryError::Pattern)?;

    let files = pattern.expand(listing, root).map_err(|source| match source {
        GlobError::Io { .. } => DiscoveryError::UnreadableRoot { root: root.to_path_buf(), source },
        other => DiscoveryError::Pattern(other),
    })?;

    let entries: Vec<Entry> = files
        .into_iter()
        .filter(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(is_entry_name))
        .map(|p| Entry::new(root, p))
        .collect();

    debug!(root = %root.display(), count = entries.len(), globbing, "discovered entries");
    Ok(entries)
}
