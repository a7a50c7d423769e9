//! Configuration loading and discovery
//!
//! Provides functions to find, load, and merge configuration. A project is
//! configured either by `sassbuild.toml` or by a Compass `config.rb`
//! (optionally at `config/compass.rb`).

use super::ruby::{parse_config_rb, RubyParseError};
use super::schema::{OutputStyle, SassConfig};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Configuration file names, in lookup order within one directory.
pub const CONFIG_FILE_NAMES: &[&str] = &["sassbuild.toml", "config.rb", "config/compass.rb"];

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// `config.rb` syntax error
    #[error("Failed to parse {0}")]
    Ruby(#[from] RubyParseError),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
    /// A configured root directory is unusable
    #[error("{role} directory '{}' {reason}", .path.display())]
    Root {
        /// Configuration key naming the root (e.g. "sass_dir")
        role: &'static str,
        /// Resolved absolute path
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override style-sheet source directory
    pub sass_dir: Option<PathBuf>,
    /// Override output directory
    pub css_dir: Option<PathBuf>,
    /// Override output style
    pub output_style: Option<OutputStyle>,
    /// Override line comments
    pub line_comments: Option<bool>,
    /// Force wildcard imports on
    pub globbing: Option<bool>,
}

/// A loaded configuration together with the directory it is relative to.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Parsed configuration
    pub config: SassConfig,
    /// Directory relative paths in the configuration resolve against
    pub project_root: PathBuf,
    /// File the configuration came from, if any
    pub source: Option<PathBuf>,
}

/// Find a configuration file by walking up from a specific directory.
///
/// Each directory is checked for every name in [`CONFIG_FILE_NAMES`] before
/// moving to its parent.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        for name in CONFIG_FILE_NAMES {
            let config_path = current.join(name);
            if config_path.is_file() {
                return Some(config_path);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Get the project root directory from a config file path.
///
/// This is the directory holding the file, except for `config/compass.rb`
/// whose project root is the parent of `config/`.
pub fn project_root(config_path: &Path) -> PathBuf {
    let parent = config_path.parent().unwrap_or_else(|| Path::new(""));
    let is_nested_compass = config_path.file_name().is_some_and(|n| n == "compass.rb")
        && parent.file_name().is_some_and(|n| n == "config");
    let root = if is_nested_compass { parent.parent().unwrap_or(parent) } else { parent };
    if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root.to_path_buf()
    }
}

/// Load configuration.
///
/// If a path is provided, loads from that file. Otherwise searches upward
/// from `cwd`; when nothing is found, returns the default configuration
/// rooted at `cwd`.
pub fn load_config(path: Option<&Path>, cwd: &Path) -> Result<LoadedConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_from(cwd.to_path_buf()),
    };

    match config_path {
        Some(p) => {
            debug!(path = %p.display(), "loading configuration");
            let config = load_config_file(&p)?;
            let root = project_root(&p);
            let root = if root.is_absolute() { root } else { cwd.join(root) };
            Ok(LoadedConfig { config, project_root: root, source: Some(p) })
        }
        None => {
            debug!("no configuration file found, using defaults");
            Ok(LoadedConfig {
                config: SassConfig::default(),
                project_root: cwd.to_path_buf(),
                source: None,
            })
        }
    }
}

/// Load configuration from a specific file path.
///
/// `.rb` files are read as Compass configuration, everything else as TOML.
pub fn load_config_file(path: &Path) -> Result<SassConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config = if path.extension().is_some_and(|e| e == "rb") {
        parse_config_str_rb(&contents)?
    } else {
        toml::from_str(&contents)?
    };

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Parse `config.rb` source into a [`SassConfig`].
pub fn parse_config_str_rb(contents: &str) -> Result<SassConfig, ConfigError> {
    let table = parse_config_rb(contents)?;
    let config: SassConfig = toml::Value::Table(table).try_into()?;
    Ok(config)
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut SassConfig, overrides: &CliOverrides) {
    if let Some(ref sass_dir) = overrides.sass_dir {
        config.sass_dir = Some(sass_dir.clone());
    }

    if let Some(ref css_dir) = overrides.css_dir {
        config.css_dir = Some(css_dir.clone());
    }

    if let Some(style) = overrides.output_style {
        config.output_style = Some(style);
    }

    if let Some(line_comments) = overrides.line_comments {
        config.line_comments = Some(line_comments);
    }

    if let Some(globbing) = overrides.globbing {
        config.globbing = Some(globbing);
    }
}
