//! Build result types.
//!
//! Contains types for representing the outcome of build operations. Entry
//! results are always kept sorted by entry path, so reports do not depend on
//! the order in which worker threads finished.

use crate::build::{CompileError, WriteError};
use crate::config::to_url_path;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Per-entry failure.
#[derive(Debug, Error)]
pub enum EntryError {
    /// The compiler rejected the entry
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// The compiled output could not be written
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl EntryError {
    /// Source line, for compile errors that carry one.
    pub fn line(&self) -> Option<usize> {
        match self {
            EntryError::Compile(e) => e.line,
            EntryError::Write(_) => None,
        }
    }
}

/// Status of a single entry.
#[derive(Debug)]
pub enum EntryStatus {
    /// Compiled and written
    Success,
    /// Listed only (dry run)
    Planned,
    /// Never started because the build was cancelled
    Cancelled,
    /// Compilation or writing failed
    Failed(EntryError),
}

impl EntryStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, EntryStatus::Success | EntryStatus::Planned)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, EntryStatus::Failed(_))
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Success => write!(f, "success"),
            EntryStatus::Planned => write!(f, "planned"),
            EntryStatus::Cancelled => write!(f, "cancelled"),
            EntryStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of building a single entry.
#[derive(Debug)]
pub struct EntryResult {
    /// Entry path relative to the source root
    pub entry: PathBuf,
    /// Build status
    pub status: EntryStatus,
    /// Output file, when one was written or planned
    pub output: Option<PathBuf>,
    /// Build duration
    pub duration: Duration,
}

impl EntryResult {
    /// Create a successful result.
    pub fn success(entry: PathBuf, output: PathBuf, duration: Duration) -> Self {
        Self { entry, status: EntryStatus::Success, output: Some(output), duration }
    }

    /// Create a planned (dry-run) result.
    pub fn planned(entry: PathBuf, output: PathBuf) -> Self {
        Self { entry, status: EntryStatus::Planned, output: Some(output), duration: Duration::ZERO }
    }

    /// Create a cancelled result.
    pub fn cancelled(entry: PathBuf) -> Self {
        Self { entry, status: EntryStatus::Cancelled, output: None, duration: Duration::ZERO }
    }

    /// Create a failed result.
    pub fn failed(entry: PathBuf, error: impl Into<EntryError>, duration: Duration) -> Self {
        Self { entry, status: EntryStatus::Failed(error.into()), output: None, duration }
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&EntryError> {
        match &self.status {
            EntryStatus::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Result of a complete build run.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Results for each entry, sorted by entry path
    entries: Vec<EntryResult>,
    /// Total build duration
    pub total_duration: Duration,
}

impl BuildReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a report from results in any order.
    pub fn from_results(results: impl IntoIterator<Item = EntryResult>) -> Self {
        let mut report = Self::new();
        for result in results {
            report.add_result(result);
        }
        report
    }

    /// Add an entry result, keeping results sorted by entry path.
    pub fn add_result(&mut self, result: EntryResult) {
        let at = self.entries.partition_point(|r| r.entry <= result.entry);
        self.entries.insert(at, result);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// All entry results, sorted by entry path.
    pub fn entries(&self) -> &[EntryResult] {
        &self.entries
    }

    /// Get the number of successful entries.
    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|r| matches!(r.status, EntryStatus::Success)).count()
    }

    /// Get the number of cancelled entries.
    pub fn cancelled_count(&self) -> usize {
        self.entries.iter().filter(|r| matches!(r.status, EntryStatus::Cancelled)).count()
    }

    /// Get the number of failed entries.
    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if the overall build succeeded (no failures, nothing cancelled).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0 && self.cancelled_count() == 0
    }

    /// Get all outputs produced.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.entries
            .iter()
            .filter(|r| matches!(r.status, EntryStatus::Success))
            .filter_map(|r| r.output.as_ref())
            .collect()
    }

    /// Get failed entry results, sorted by entry path.
    pub fn failures(&self) -> Vec<&EntryResult> {
        self.entries.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// One line per failed entry, sorted by path: `path:line: message`.
    pub fn error_report(&self) -> String {
        self.failures()
            .iter()
            .filter_map(|r| r.error().map(|e| format_failure(r, e)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let success = self.success_count();
        let cancelled = self.cancelled_count();
        let failed = self.failed_count();
        let total = self.entries.len();

        if failed > 0 || cancelled > 0 {
            lines.push(format!(
                "Build failed: {} compiled, {} failed, {} cancelled ({} total)",
                success, failed, cancelled, total
            ));
            for result in self.failures() {
                if let Some(err) = result.error() {
                    lines.push(format!("  - {}", format_failure(result, err)));
                }
            }
        } else {
            lines.push(format!(
                "Build succeeded: {} compiled ({} total) in {:?}",
                success, total, self.total_duration
            ));
        }

        lines.join("\n")
    }
}

fn format_failure(result: &EntryResult, err: &EntryError) -> String {
    match err {
        // compile errors already lead with path and line
        EntryError::Compile(e) => e.to_string(),
        EntryError::Write(e) => format!("{}: {}", to_url_path(&result.entry), e),
    }
}
