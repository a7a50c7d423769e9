//! Build pipeline orchestration.
//!
//! The pipeline discovers entries, then runs compile → rewrite → write for
//! each one on the worker pool and gathers the outcomes into a
//! [`BuildReport`]. Configuration and discovery failures abort the build
//! before anything is written; per-entry failures are collected.

use crate::build::{
    compile_entry, default_jobs, discover_entries, run_parallel, write_artifact, BuildContext,
    BuildReport, CancellationToken, DiscoveryError, Entry, EntryResult, GrassCompiler,
    StyleCompiler, UrlRewriter,
};
use crate::config::ConfigError;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Fatal build error.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Discovery error
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
}

/// Build pipeline for executing builds.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
    /// Underlying style-language compiler
    compiler: Arc<dyn StyleCompiler>,
    /// Number of worker threads
    jobs: usize,
    /// Whether to do a dry run (list entries without compiling)
    dry_run: bool,
    /// Stops workers from claiming further entries
    cancel: CancellationToken,
}

impl BuildPipeline {
    /// Create a new build pipeline using the grass compiler.
    pub fn new(context: BuildContext) -> Self {
        Self {
            context,
            compiler: Arc::new(GrassCompiler),
            jobs: default_jobs(),
            dry_run: false,
            cancel: CancellationToken::new(),
        }
    }

    /// Use a different compiler.
    pub fn with_compiler(mut self, compiler: Arc<dyn StyleCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Set the number of parallel jobs.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Set dry-run mode (don't actually build).
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Use an externally controlled cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this pipeline.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Get the number of parallel jobs.
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Run the build pipeline.
    ///
    /// Discovers entries and builds each of them.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let entries = discover_entries(&self.context)?;
        info!(
            entries = entries.len(),
            jobs = self.jobs,
            root = %self.context.src_dir().display(),
            "starting build"
        );

        let report = self.build_entries(&entries);
        Ok(report.with_duration(start.elapsed()))
    }

    /// Build an already-discovered list of entries.
    pub fn build_entries(&self, entries: &[Entry]) -> BuildReport {
        let start = Instant::now();

        if self.dry_run {
            let planned = entries.iter().map(|entry| {
                EntryResult::planned(
                    entry.relative_path.clone(),
                    self.context.out_dir().join(&entry.relative_output_path),
                )
            });
            return BuildReport::from_results(planned.collect::<Vec<_>>());
        }

        let rewriter = UrlRewriter::new(self.context.paths());
        let results = run_parallel(
            entries,
            self.jobs,
            &self.cancel,
            |entry| self.process_entry(entry, &rewriter),
            |entry| EntryResult::cancelled(entry.relative_path.clone()),
        );

        let report = BuildReport::from_results(results).with_duration(start.elapsed());
        info!(
            compiled = report.success_count(),
            failed = report.failed_count(),
            cancelled = report.cancelled_count(),
            "build finished"
        );
        report
    }

    /// Compile, rewrite and write one entry.
    fn process_entry(&self, entry: &Entry, rewriter: &UrlRewriter) -> EntryResult {
        let start = Instant::now();
        let name = entry.relative_path.clone();

        let mut artifact = match compile_entry(entry, &self.context, self.compiler.as_ref()) {
            Ok(artifact) => artifact,
            Err(e) => {
                debug!(entry = %entry.display_path(), error = %e, "compile failed");
                return EntryResult::failed(name, e, start.elapsed());
            }
        };

        artifact.bytes = rewriter.rewrite_bytes(std::mem::take(&mut artifact.bytes));

        match write_artifact(&artifact) {
            Ok(output) => {
                debug!(
                    entry = %entry.display_path(),
                    url = %self.context.paths().public_style_url(&entry.relative_output_path),
                    "published"
                );
                EntryResult::success(name, output, start.elapsed())
            }
            Err(e) => EntryResult::failed(name, e, start.elapsed()),
        }
    }
}
