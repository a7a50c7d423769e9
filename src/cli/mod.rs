//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::OutputStyle;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// sassbuild - Compile a Compass-style Sass project to CSS
#[derive(Parser)]
#[command(name = "sassbuild")]
#[command(about = "sassbuild - Compile a Compass-style Sass project to published CSS")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile every entry style sheet in the project
    Compile {
        /// Configuration file (sassbuild.toml or config.rb); searched upward if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the style-sheet source directory
        #[arg(long)]
        sass_dir: Option<PathBuf>,

        /// Override the CSS output directory
        #[arg(long)]
        css_dir: Option<PathBuf>,

        /// Output style: expanded or compressed
        #[arg(long)]
        output_style: Option<OutputStyle>,

        /// Emit source-location comments
        #[arg(long, conflicts_with = "no_line_comments")]
        line_comments: bool,

        /// Do not emit source-location comments
        #[arg(long)]
        no_line_comments: bool,

        /// Enable wildcard imports and nested entry discovery
        #[arg(long)]
        globbing: bool,

        /// Number of parallel compile jobs (default: available CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// List the entries that would be compiled without compiling them
        #[arg(long)]
        dry_run: bool,

        /// Show debug logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Remove compiled CSS files for the project's entries
    Clean {
        /// Configuration file (sassbuild.toml or config.rb); searched upward if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show debug logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the resolved configuration
    Config {
        /// Configuration file (sassbuild.toml or config.rb); searched upward if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Install the log subscriber. `RUST_LOG` wins over the verbosity flag.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "sassbuild=debug" } else { "sassbuild=warn" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            config,
            sass_dir,
            css_dir,
            output_style,
            line_comments,
            no_line_comments,
            globbing,
            jobs,
            dry_run,
            verbose,
        } => {
            init_logging(verbose);
            let line_comments = match (line_comments, no_line_comments) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            build::run_compile(build::CompileArgs {
                config,
                sass_dir,
                css_dir,
                output_style,
                line_comments,
                globbing: globbing.then_some(true),
                jobs,
                dry_run,
                verbose,
            })
        }
        Commands::Clean { config, verbose } => {
            init_logging(verbose);
            build::run_clean(config.as_deref())
        }
        Commands::Config { config, json } => {
            init_logging(false);
            build::run_config(config.as_deref(), json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compile_flags() {
        let cli = Cli::try_parse_from([
            "sassbuild",
            "compile",
            "--output-style",
            ":compressed",
            "--no-line-comments",
            "-j",
            "4",
        ])
        .unwrap();

        match cli.command {
            Commands::Compile { output_style, no_line_comments, jobs, .. } => {
                assert_eq!(output_style, Some(OutputStyle::Compressed));
                assert!(no_line_comments);
                assert_eq!(jobs, Some(4));
            }
            _ => panic!("expected compile"),
        }
    }

    #[test]
    fn test_parse_rejects_nested_style() {
        assert!(Cli::try_parse_from(["sassbuild", "compile", "--output-style", "nested"]).is_err());
    }
}
