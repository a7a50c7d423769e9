//! Build System Test Suite
//!
//! Integration tests for the sassbuild pipeline. Tests cover:
//!
//! - Configuration loading (TOML and Compass `config.rb`)
//! - Entry discovery
//! - Per-entry failure collection
//! - Output styles and asset URL rewriting
//! - Deterministic reports under parallel execution
//! - Cancellation and cleaning

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use sassbuild::build::{
    clean_outputs, discover_entries, BuildContext, BuildPipeline, CompileRequest, CompilerFailure,
    EntryStatus, StyleCompiler,
};
use sassbuild::config::{load_config, OutputStyle, SassConfig};

// ============================================================================
// Test Utilities
// ============================================================================

const JOURNAL_CONFIG: &str = r#"require 'sass-globbing'

# Require any additional compass plugins here.
project_type = :stand_alone

# Publishing paths
http_path = "/journal/"
http_images_path = "/journal/images"
http_generated_images_path = "/images"
http_fonts_path = "/journal/fonts"
css_dir = "public/journal/stylesheets"

# Local development paths
sass_dir = "sass"
images_dir = "source/images"
fonts_dir = "source/fonts"

line_comments = false
output_style = :compressed
"#;

/// Create a test file with content, creating parent directories.
fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Create a project with a `sass/` directory holding the given files.
fn create_project(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("sass")).unwrap();
    for (name, content) in files {
        create_test_file(&temp.path().join("sass"), name, content);
    }
    temp
}

fn context(temp: &TempDir, config: &SassConfig) -> BuildContext {
    BuildContext::from_config(config, temp.path()).unwrap()
}

/// Compiler that echoes its input after a per-entry delay, failing on any
/// line containing `!fail`.
struct DelayedCompiler {
    delays: Vec<(&'static str, u64)>,
}

impl StyleCompiler for DelayedCompiler {
    fn compile(&self, source: &str, request: &CompileRequest<'_>) -> Result<String, CompilerFailure> {
        let name = request.path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if let Some((_, ms)) = self.delays.iter().find(|(n, _)| *n == name) {
            std::thread::sleep(Duration::from_millis(*ms));
        }
        match source.lines().position(|l| l.contains("!fail")) {
            Some(idx) => Err(CompilerFailure {
                message: format!("bad token in {}", name),
                line: Some(idx + 1),
            }),
            None => Ok(source.to_string()),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_journal_config_rb_loads() {
    let temp = create_project(&[]);
    let config_path = create_test_file(temp.path(), "config.rb", JOURNAL_CONFIG);

    let loaded = load_config(None, &temp.path().join("sass")).unwrap();
    assert_eq!(loaded.source, Some(config_path));
    assert_eq!(loaded.project_root, temp.path());

    let ctx = BuildContext::from_config(&loaded.config, &loaded.project_root).unwrap();
    let paths = ctx.paths();
    assert_eq!(paths.output_style_root, temp.path().join("public/journal/stylesheets"));
    assert_eq!(paths.source_image_root, temp.path().join("source/images"));
    assert_eq!(paths.source_generated_image_root, temp.path().join("source/images"));
    assert_eq!(paths.output_image_url_prefix, "/journal/images");
    assert_eq!(paths.output_generated_image_url_prefix, "/images");
    assert_eq!(paths.output_font_url_prefix, "/journal/fonts");

    let options = ctx.options();
    assert!(options.globbing_enabled);
    assert!(!options.emit_comments);
    assert_eq!(options.output_style, OutputStyle::Compressed);
}

#[test]
fn test_missing_source_root_is_config_error() {
    let temp = TempDir::new().unwrap();
    assert!(BuildContext::from_config(&SassConfig::default(), temp.path()).is_err());
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn test_discovery_finds_every_entry_once() {
    let temp = create_project(&[
        ("one.scss", "a{}"),
        ("two.scss", "b{}"),
        ("three.scss", "c{}"),
        ("_partial.scss", "$x: 1;"),
        ("nested/four.scss", "d{}"),
    ]);
    let config = SassConfig { globbing: Some(true), ..Default::default() };

    let entries = discover_entries(&context(&temp, &config)).unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.display_path()).collect();
    assert_eq!(names, vec!["nested/four.scss", "one.scss", "three.scss", "two.scss"]);
}

#[test]
fn test_discovery_without_globbing_is_top_level() {
    let temp = create_project(&[("one.scss", "a{}"), ("nested/two.scss", "b{}")]);
    let entries = discover_entries(&context(&temp, &SassConfig::default())).unwrap();
    assert_eq!(entries.len(), 1);
}

// ============================================================================
// Pipeline
// ============================================================================

#[test]
fn test_failed_entry_does_not_stop_siblings() {
    let temp = create_project(&[
        ("a.scss", "a {\n  color: red;\n}\n"),
        ("b.scss", "b {\n  margin: 0;\n  color: $undefined;\n}\n"),
    ]);

    let report = BuildPipeline::new(context(&temp, &SassConfig::default())).build().unwrap();

    assert!(!report.is_success());
    assert!(temp.path().join("stylesheets/a.css").exists());
    assert!(!temp.path().join("stylesheets/b.css").exists());

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].entry, PathBuf::from("b.scss"));
    assert_eq!(failures[0].error().and_then(|e| e.line()), Some(3));
    assert!(report.error_report().starts_with("b.scss:3: "));
}

#[test]
fn test_compressed_output_has_no_newlines() {
    let temp = create_project(&[("screen.scss", "a {\n  color: red;\n  margin: 0;\n  padding: 1px;\n}\n")]);
    let config = SassConfig { output_style: Some(OutputStyle::Compressed), ..Default::default() };

    let report = BuildPipeline::new(context(&temp, &config)).build().unwrap();
    assert!(report.is_success());

    let css = fs::read_to_string(temp.path().join("stylesheets/screen.css")).unwrap();
    assert!(!css.trim_end().contains('\n'));
    assert!(css.contains("color:red;margin:0"));
}

#[test]
fn test_expanded_output_carries_line_comment() {
    let temp = create_project(&[("screen.scss", "a { color: red; }")]);
    BuildPipeline::new(context(&temp, &SassConfig::default())).build().unwrap();

    let css = fs::read_to_string(temp.path().join("stylesheets/screen.css")).unwrap();
    assert!(css.starts_with("/* line 1, sass/screen.scss */"));
}

#[test]
fn test_asset_urls_rewritten_end_to_end() {
    let temp = create_project(&[("screen.scss", ".logo { background: url(images/logo.png); }")]);
    create_test_file(temp.path(), "images/logo.png", "png");
    let config = SassConfig {
        http_images_path: Some("/images".to_string()),
        line_comments: Some(false),
        ..Default::default()
    };

    let report = BuildPipeline::new(context(&temp, &config)).build().unwrap();
    assert!(report.is_success());

    let css = fs::read_to_string(temp.path().join("stylesheets/screen.css")).unwrap();
    assert!(css.contains("url(/images/logo.png)"), "got: {}", css);
}

#[test]
fn test_journal_project_end_to_end() {
    let temp = create_project(&[
        ("screen.scss", "@import \"partials/*\";\nbody { background: url(bg.png); }\n"),
        ("partials/_a.scss", ".a { color: red; }"),
        ("partials/_b.scss", ".b { src: url('body.woff'); }"),
    ]);
    create_test_file(temp.path(), "config.rb", JOURNAL_CONFIG);
    create_test_file(temp.path(), "source/images/bg.png", "png");
    create_test_file(temp.path(), "source/fonts/body.woff", "woff");

    let loaded = load_config(None, temp.path()).unwrap();
    let ctx = BuildContext::from_config(&loaded.config, &loaded.project_root).unwrap();
    let report = BuildPipeline::new(ctx).build().unwrap();
    assert!(report.is_success(), "{}", report.summary());

    let css =
        fs::read_to_string(temp.path().join("public/journal/stylesheets/screen.css")).unwrap();
    assert!(css.contains(".a{color:red}"));
    assert!(css.contains("url(/journal/images/bg.png)"));
    assert!(css.contains("url(\"/journal/fonts/body.woff\")") || css.contains("url('/journal/fonts/body.woff')"));
    assert!(!css.contains("/* line"));
}

#[test]
fn test_reports_identical_under_shuffled_completion() {
    let temp = create_project(&[
        ("a.scss", "x\n!fail\n"),
        ("b.scss", "ok"),
        ("c.scss", "x\nx\n!fail\n"),
        ("d.scss", "ok"),
        ("e.scss", "!fail"),
    ]);
    let config = SassConfig { line_comments: Some(false), ..Default::default() };

    let fast_first = DelayedCompiler {
        delays: vec![("a.scss", 1), ("b.scss", 5), ("c.scss", 10), ("d.scss", 15), ("e.scss", 20)],
    };
    let slow_first = DelayedCompiler {
        delays: vec![("a.scss", 20), ("b.scss", 15), ("c.scss", 10), ("d.scss", 5), ("e.scss", 1)],
    };

    let first = BuildPipeline::new(context(&temp, &config))
        .with_compiler(Arc::new(fast_first))
        .with_jobs(5)
        .build()
        .unwrap();
    let second = BuildPipeline::new(context(&temp, &config))
        .with_compiler(Arc::new(slow_first))
        .with_jobs(5)
        .build()
        .unwrap();

    assert_eq!(first.error_report(), second.error_report());
    assert_eq!(
        first.error_report(),
        "a.scss:2: bad token in a.scss\nc.scss:3: bad token in c.scss\ne.scss:1: bad token in e.scss"
    );
}

#[test]
fn test_cancelled_build_writes_nothing() {
    let temp = create_project(&[("a.scss", "a{}"), ("b.scss", "b{}"), ("c.scss", "c{}")]);
    let pipeline = BuildPipeline::new(context(&temp, &SassConfig::default()));
    pipeline.cancellation_token().cancel();

    let report = pipeline.build().unwrap();
    assert!(report.entries().iter().all(|r| matches!(r.status, EntryStatus::Cancelled)));
    assert!(!report.is_success());
    assert!(!temp.path().join("stylesheets").exists());
}

#[test]
fn test_blocked_destination_fails_only_that_entry() {
    let temp = create_project(&[("a.scss", "a { color: red; }"), ("b.scss", "b { color: red; }")]);
    fs::create_dir_all(temp.path().join("stylesheets/b.css")).unwrap();

    let report = BuildPipeline::new(context(&temp, &SassConfig::default())).build().unwrap();

    assert!(!report.is_success());
    assert!(temp.path().join("stylesheets/a.css").is_file());
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].entry, PathBuf::from("b.scss"));
    assert_eq!(failures[0].error().and_then(|e| e.line()), None);
}

#[cfg(unix)]
#[test]
fn test_published_css_is_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let temp = create_project(&[("a.scss", "a { color: red; }")]);
    let report = BuildPipeline::new(context(&temp, &SassConfig::default())).build().unwrap();
    assert!(report.is_success());

    let mode = fs::metadata(temp.path().join("stylesheets/a.css")).unwrap().permissions().mode();
    assert_eq!(mode & 0o044, 0o044);
}

#[test]
fn test_rebuild_replaces_outputs() {
    let temp = create_project(&[("screen.scss", "a { color: red; }")]);
    let config = SassConfig { line_comments: Some(false), ..Default::default() };
    BuildPipeline::new(context(&temp, &config)).build().unwrap();

    fs::write(temp.path().join("sass/screen.scss"), "a { color: blue; }").unwrap();
    BuildPipeline::new(context(&temp, &config)).build().unwrap();

    let css = fs::read_to_string(temp.path().join("stylesheets/screen.css")).unwrap();
    assert!(css.contains("blue"));
    assert!(!css.contains("red"));
}

// ============================================================================
// Clean
// ============================================================================

#[test]
fn test_clean_after_build() {
    let temp = create_project(&[("a.scss", "a { color: red; }"), ("b.scss", "b { color: red; }")]);
    let ctx = context(&temp, &SassConfig::default());
    BuildPipeline::new(ctx.clone()).build().unwrap();
    create_test_file(temp.path(), "stylesheets/keep.css", "k{}");

    let report = clean_outputs(&ctx).unwrap();
    assert_eq!(report.removed.len(), 2);
    assert!(!temp.path().join("stylesheets/a.css").exists());
    assert!(temp.path().join("stylesheets/keep.css").exists());
}
