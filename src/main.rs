//! sassbuild - Command-line tool for compiling Compass-style Sass projects

use std::process::ExitCode;

use sassbuild::cli;

fn main() -> ExitCode {
    cli::run()
}
