//! Build command implementations (compile, clean, config)

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::build::{clean_outputs, BuildContext, BuildPipeline};
use crate::config::{load_config, merge_cli_overrides, CliOverrides, LoadedConfig, OutputStyle};

/// Arguments of the compile command.
pub struct CompileArgs {
    pub config: Option<PathBuf>,
    pub sass_dir: Option<PathBuf>,
    pub css_dir: Option<PathBuf>,
    pub output_style: Option<OutputStyle>,
    pub line_comments: Option<bool>,
    pub globbing: Option<bool>,
    pub jobs: Option<usize>,
    pub dry_run: bool,
    pub verbose: bool,
}

/// Load the configuration and resolve it into a build context.
fn load_context(
    config_path: Option<&Path>,
    overrides: &CliOverrides,
) -> Result<(LoadedConfig, BuildContext), ExitCode> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut loaded = match load_config(config_path, &cwd) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return Err(ExitCode::from(EXIT_INVALID_ARGS));
        }
    };
    merge_cli_overrides(&mut loaded.config, overrides);

    match BuildContext::from_config(&loaded.config, &loaded.project_root) {
        Ok(ctx) => Ok((loaded, ctx)),
        Err(e) => {
            eprintln!("Error: {}", e);
            Err(ExitCode::from(EXIT_INVALID_ARGS))
        }
    }
}

/// Run the compile command
pub fn run_compile(args: CompileArgs) -> ExitCode {
    let overrides = CliOverrides {
        sass_dir: args.sass_dir,
        css_dir: args.css_dir,
        output_style: args.output_style,
        line_comments: args.line_comments,
        globbing: args.globbing,
    };

    let (loaded, context) = match load_context(args.config.as_deref(), &overrides) {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    if args.verbose {
        match &loaded.source {
            Some(path) => println!("Using config: {}", path.display()),
            None => println!("No configuration file found, using defaults"),
        }
    }

    let context = context.with_verbose(args.verbose);
    let src_dir = context.src_dir().to_path_buf();
    let out_dir = context.out_dir().to_path_buf();

    let mut pipeline = BuildPipeline::new(context).with_dry_run(args.dry_run);
    if let Some(jobs) = args.jobs {
        pipeline = pipeline.with_jobs(jobs);
    }

    let token = pipeline.cancellation_token();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        tracing::warn!(error = %e, "could not install interrupt handler");
    }

    let report = match pipeline.build() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Build error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    if args.dry_run {
        println!("Dry run - would compile:");
        println!("  Source: {}", src_dir.display());
        println!("  Output: {}", out_dir.display());
        println!("  Entries: {}", report.entries().len());
        for result in report.entries() {
            println!("    - {}", crate::config::to_url_path(&result.entry));
        }
        return ExitCode::from(EXIT_SUCCESS);
    }

    if pipeline.context().is_verbose() {
        for result in report.entries() {
            println!("  {} {}", crate::config::to_url_path(&result.entry), result.status);
        }
    }

    if report.is_success() {
        println!("{}", report.summary());
        ExitCode::from(EXIT_SUCCESS)
    } else {
        eprintln!("{}", report.summary());
        ExitCode::from(EXIT_ERROR)
    }
}

/// Run the clean command
pub fn run_clean(config_path: Option<&Path>) -> ExitCode {
    let (_, context) = match load_context(config_path, &CliOverrides::default()) {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    match clean_outputs(&context) {
        Ok(report) if report.is_success() => {
            println!("{}", report.summary());
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(report) => {
            eprintln!("{}", report.summary());
            ExitCode::from(EXIT_ERROR)
        }
        Err(e) => {
            eprintln!("Clean error: {}", e);
            ExitCode::from(EXIT_INVALID_ARGS)
        }
    }
}

/// Run the config command
pub fn run_config(config_path: Option<&Path>, json: bool) -> ExitCode {
    let (loaded, context) = match load_context(config_path, &CliOverrides::default()) {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    if json {
        let value = serde_json::json!({
            "source": loaded.source,
            "project_root": loaded.project_root,
            "config": loaded.config,
            "paths": context.paths(),
            "options": context.options(),
        });
        match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
        return ExitCode::from(EXIT_SUCCESS);
    }

    let paths = context.paths();
    let options = context.options();
    match &loaded.source {
        Some(path) => println!("Config: {}", path.display()),
        None => println!("Config: (defaults)"),
    }
    println!("Project root: {}", loaded.project_root.display());
    println!("Sass dir:     {}", paths.source_style_root.display());
    println!("CSS dir:      {}", paths.output_style_root.display());
    println!("Images dir:   {} -> {}", paths.source_image_root.display(), paths.output_image_url_prefix);
    println!(
        "Generated:    {} -> {}",
        paths.source_generated_image_root.display(),
        paths.output_generated_image_url_prefix
    );
    println!("Fonts dir:    {} -> {}", paths.source_font_root.display(), paths.output_font_url_prefix);
    println!("Stylesheets:  {}", paths.public_style_prefix);
    println!("Output style: {}", options.output_style);
    println!("Line comments: {}", options.emit_comments);
    println!("Globbing:     {}", options.globbing_enabled);
    ExitCode::from(EXIT_SUCCESS)
}
