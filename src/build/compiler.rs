//! Style-sheet compilation.
//!
//! The Sass language itself is delegated to a [`StyleCompiler`]; the
//! production implementation wraps the pure-Rust `grass` compiler. This
//! module turns one [`Entry`] into a [`CompiledArtifact`]: it reads the
//! source, expands wildcard imports when globbing is on, compiles, and adds
//! the source-location annotation when line comments are requested.

use crate::build::globbing::FsListing;
use crate::build::imports::expand_glob_imports;
use crate::build::{BuildContext, Entry};
use crate::config::{to_url_path, OutputStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Compilation of one entry failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{}: {message}", to_url_path(.entry), .line.map(|l| format!(":{}", l)).unwrap_or_default())]
pub struct CompileError {
    /// Entry path relative to the source root
    pub entry: PathBuf,
    /// Compiler diagnostic (first line)
    pub message: String,
    /// 1-based source line, when the compiler reported one
    pub line: Option<usize>,
}

/// Failure reported by a [`StyleCompiler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerFailure {
    /// Diagnostic message
    pub message: String,
    /// 1-based source line, if known
    pub line: Option<usize>,
}

impl CompilerFailure {
    /// Build a failure from a multi-line compiler diagnostic, pulling out the
    /// message and the line number.
    pub fn from_diagnostic(diagnostic: &str) -> Self {
        Self { message: diagnostic_message(diagnostic), line: diagnostic_line(diagnostic) }
    }
}

/// Inputs for one compiler invocation besides the source text.
#[derive(Debug, Clone)]
pub struct CompileRequest<'a> {
    /// Absolute path of the entry (for diagnostics)
    pub path: &'a Path,
    /// Directories searched by `@import` / `@use`
    pub load_paths: &'a [PathBuf],
    /// Output serialization
    pub style: OutputStyle,
}

/// An underlying style-language compiler: `(source, options) -> css | error`.
pub trait StyleCompiler: Send + Sync {
    /// Compile `source` to CSS.
    fn compile(&self, source: &str, request: &CompileRequest<'_>) -> Result<String, CompilerFailure>;
}

/// [`StyleCompiler`] backed by the `grass` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrassCompiler;

impl StyleCompiler for GrassCompiler {
    fn compile(&self, source: &str, request: &CompileRequest<'_>) -> Result<String, CompilerFailure> {
        let style = match request.style {
            OutputStyle::Expanded => grass::OutputStyle::Expanded,
            OutputStyle::Compressed => grass::OutputStyle::Compressed,
        };

        let options = grass::Options::default().load_paths(request.load_paths).style(style).quiet(true);

        grass::from_string(source.to_string(), &options)
            .map_err(|e| CompilerFailure::from_diagnostic(&e.to_string()))
    }
}

/// Compiled output of one entry, not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    /// Entry path relative to the source root
    pub entry: PathBuf,
    /// Absolute output path
    pub destination_path: PathBuf,
    /// CSS bytes
    pub bytes: Vec<u8>,
}

/// Compile a single entry.
pub fn compile_entry(
    entry: &Entry,
    ctx: &BuildContext,
    compiler: &dyn StyleCompiler,
) -> Result<CompiledArtifact, CompileError> {
    let fail = |message: String, line: Option<usize>| CompileError {
        entry: entry.relative_path.clone(),
        message,
        line,
    };

    let source = fs::read_to_string(&entry.source_path)
        .map_err(|e| fail(format!("cannot read source: {}", e), None))?;

    let load_paths = ctx.load_paths_for(&entry.source_path);
    let source = if ctx.options().globbing_enabled {
        expand_glob_imports(&source, &load_paths, &entry.source_path, &FsListing)
            .map_err(|e| fail(e.to_string(), None))?
    } else {
        source
    };

    let request = CompileRequest {
        path: &entry.source_path,
        load_paths: &load_paths,
        style: ctx.options().output_style,
    };
    debug!(entry = %entry.display_path(), style = %request.style, "compiling");

    let css = compiler.compile(&source, &request).map_err(|f| fail(f.message, f.line))?;
    let css = annotate(css, entry, ctx);

    Ok(CompiledArtifact {
        entry: entry.relative_path.clone(),
        destination_path: ctx.out_dir().join(&entry.relative_output_path),
        bytes: css.into_bytes(),
    })
}

/// Prefix the output with a `/* line 1, sass/screen.scss */` annotation.
///
/// Compressed output never carries annotations.
fn annotate(css: String, entry: &Entry, ctx: &BuildContext) -> String {
    let options = ctx.options();
    if !options.emit_comments || options.output_style == OutputStyle::Compressed {
        return css;
    }
    let sass_dir = ctx.src_dir().file_name().map(PathBuf::from).unwrap_or_default();
    format!("/* line 1, {} */\n{}", to_url_path(&sass_dir.join(&entry.relative_path)), css)
}

/// `3 │ ...` snippet lines (unicode or ASCII gutter).
static SNIPPET_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*(\d+)\s+[│|]").unwrap());

/// Trailing `path:3:7` or `path 3:7` location.
static LOCATION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)[\s:](\d+):\d+(?:\s+root stylesheet)?\s*$").unwrap());

fn diagnostic_message(diagnostic: &str) -> String {
    let first = diagnostic.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("compilation failed");
    first.strip_prefix("Error:").map(str::trim).unwrap_or(first).to_string()
}

fn diagnostic_line(diagnostic: &str) -> Option<usize> {
    LOCATION_SUFFIX
        .captures_iter(diagnostic)
        .last()
        .or_else(|| SNIPPET_LINE.captures(diagnostic))
        .and_then(|caps| caps[1].parse().ok())
}
