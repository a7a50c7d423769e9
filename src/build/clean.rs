//! Removal of compiled outputs.
//!
//! Only files that some current entry would produce are removed; anything
//! else in the output root is left alone.

use crate::build::{discover_entries, BuildContext, DiscoveryError};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Result of a clean run.
#[derive(Debug, Default)]
pub struct CleanReport {
    /// Files that were deleted
    pub removed: Vec<PathBuf>,
    /// Files that could not be deleted
    pub errors: Vec<(PathBuf, io::Error)>,
}

impl CleanReport {
    /// Check if every existing output was removed.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Format a summary of the clean result.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Removed {} file(s)", self.removed.len())];
        for (path, err) in &self.errors {
            lines.push(format!("  - {}: {}", path.display(), err));
        }
        lines.join("\n")
    }
}

/// Delete the `.css` file of every discovered entry.
pub fn clean_outputs(ctx: &BuildContext) -> Result<CleanReport, DiscoveryError> {
    let entries = discover_entries(ctx)?;
    let mut report = CleanReport::default();

    for entry in &entries {
        let output = ctx.out_dir().join(&entry.relative_output_path);
        match fs::remove_file(&output) {
            Ok(()) => {
                debug!(path = %output.display(), "removed");
                report.removed.push(output);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %output.display(), error = %e, "failed to remove output");
                report.errors.push((output, e));
            }
        }
    }

    Ok(report)
}
