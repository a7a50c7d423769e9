//! Configuration schema types for `sassbuild.toml` and Compass `config.rb`
//!
//! Both file formats deserialize into the same flat [`SassConfig`]. Every key
//! is optional; defaults that depend on other keys (for example
//! `http_images_path` derived from `http_path`) are filled in by the path
//! resolver, not here.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the plugin that turns on wildcard imports.
pub const GLOBBING_PLUGIN: &str = "sass-globbing";

/// Project layout preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    /// Plain directory layout (`sass/`, `stylesheets/`, `images/`, `fonts/`)
    #[default]
    StandAlone,
    /// Rails asset layout (`app/assets/stylesheets`, `public/...`)
    Rails,
}

impl ProjectType {
    /// Default style-sheet source directory for this layout.
    pub fn default_sass_dir(self) -> &'static str {
        match self {
            ProjectType::StandAlone => "sass",
            ProjectType::Rails => "app/assets/stylesheets",
        }
    }

    /// Default compiled output directory for this layout.
    pub fn default_css_dir(self) -> &'static str {
        match self {
            ProjectType::StandAlone => "stylesheets",
            ProjectType::Rails => "public/stylesheets",
        }
    }

    /// Default image source directory for this layout.
    pub fn default_images_dir(self) -> &'static str {
        match self {
            ProjectType::StandAlone => "images",
            ProjectType::Rails => "public/images",
        }
    }

    /// Default font source directory for this layout.
    pub fn default_fonts_dir(self) -> &'static str {
        match self {
            ProjectType::StandAlone => "fonts",
            ProjectType::Rails => "public/fonts",
        }
    }
}

/// Serialization mode for compiled CSS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// One declaration per line, rules separated by blank lines
    #[default]
    Expanded,
    /// Whitespace-minimized output
    Compressed,
}

impl std::fmt::Display for OutputStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputStyle::Expanded => write!(f, "expanded"),
            OutputStyle::Compressed => write!(f, "compressed"),
        }
    }
}

impl std::str::FromStr for OutputStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches(':') {
            "expanded" => Ok(OutputStyle::Expanded),
            "compressed" => Ok(OutputStyle::Compressed),
            other => Err(format!(
                "unsupported output style '{}' (expected 'expanded' or 'compressed')",
                other
            )),
        }
    }
}

/// Complete project configuration.
///
/// Keys mirror the Compass configuration names so an existing `config.rb`
/// maps onto this struct without renaming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SassConfig {
    /// Layout preset used for directory defaults
    pub project_type: ProjectType,
    /// Root URL the project is published under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_path: Option<String>,
    /// Published URL prefix for images
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_images_path: Option<String>,
    /// Published URL prefix for generated images
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_generated_images_path: Option<String>,
    /// Published URL prefix for fonts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_fonts_path: Option<String>,
    /// Published URL prefix for compiled style sheets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_stylesheets_path: Option<String>,
    /// Compiled CSS output directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css_dir: Option<PathBuf>,
    /// Style-sheet source directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sass_dir: Option<PathBuf>,
    /// Image source directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images_dir: Option<PathBuf>,
    /// Generated image directory (defaults to `images_dir`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_images_dir: Option<PathBuf>,
    /// Font source directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fonts_dir: Option<PathBuf>,
    /// Extra directories searched by `@import`
    pub additional_import_paths: Vec<PathBuf>,
    /// Emit `/* line N, file */` annotations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_comments: Option<bool>,
    /// Output serialization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_style: Option<OutputStyle>,
    /// Expand wildcard imports and discover nested entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub globbing: Option<bool>,
    /// Plugins named by `require` lines in `config.rb`
    pub plugins: Vec<String>,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Name of the invalid key (e.g., "http_path")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' {}", self.field, self.message)
    }
}

impl SassConfig {
    /// Whether wildcard imports are enabled, either by key or by plugin.
    pub fn globbing_enabled(&self) -> bool {
        self.globbing.unwrap_or_else(|| self.plugins.iter().any(|p| p == GLOBBING_PLUGIN))
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        let dirs = [
            ("css_dir", &self.css_dir),
            ("sass_dir", &self.sass_dir),
            ("images_dir", &self.images_dir),
            ("generated_images_dir", &self.generated_images_dir),
            ("fonts_dir", &self.fonts_dir),
        ];
        for (field, dir) in dirs {
            if matches!(dir, Some(d) if d.as_os_str().is_empty()) {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: "must be a non-empty path".to_string(),
                });
            }
        }

        let urls = [
            ("http_path", &self.http_path),
            ("http_images_path", &self.http_images_path),
            ("http_generated_images_path", &self.http_generated_images_path),
            ("http_fonts_path", &self.http_fonts_path),
            ("http_stylesheets_path", &self.http_stylesheets_path),
        ];
        for (field, url) in urls {
            if let Some(url) = url {
                if !is_publishable_url(url) {
                    errors.push(ConfigValidationError {
                        field: field.to_string(),
                        message: "must be an absolute URL path (starting with '/') or a full URL"
                            .to_string(),
                    });
                }
            }
        }

        if self.sass_dir.is_some() && self.sass_dir == self.css_dir {
            errors.push(ConfigValidationError {
                field: "css_dir".to_string(),
                message: "must differ from sass_dir".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

fn is_publishable_url(url: &str) -> bool {
    url.starts_with('/') || url.contains("://")
}
