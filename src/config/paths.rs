//! Resolution of configured roles into absolute paths and published URLs.
//!
//! [`resolve`] is the only place configuration defaults are applied. The
//! resulting [`PathConfig`] and [`BuildOptions`] are immutable and passed by
//! reference to every build stage.

use super::loader::ConfigError;
use super::schema::{OutputStyle, ProjectType, SassConfig};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Absolute path and URL table for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathConfig {
    /// Directory holding `.scss` sources
    pub source_style_root: PathBuf,
    /// Directory holding source images
    pub source_image_root: PathBuf,
    /// Directory holding generated images
    pub source_generated_image_root: PathBuf,
    /// Directory holding source fonts
    pub source_font_root: PathBuf,
    /// Directory compiled `.css` files are written to
    pub output_style_root: PathBuf,
    /// Published URL prefix for images
    pub output_image_url_prefix: String,
    /// Published URL prefix for generated images
    pub output_generated_image_url_prefix: String,
    /// Published URL prefix for fonts
    pub output_font_url_prefix: String,
    /// Published URL prefix for compiled style sheets
    pub public_style_prefix: String,
    /// Extra `@import` search directories
    pub import_paths: Vec<PathBuf>,
}

impl PathConfig {
    /// Published URL of a compiled style sheet, given its path relative to
    /// the output root.
    pub fn public_style_url(&self, relative_output: &Path) -> String {
        join_url(&self.public_style_prefix, &to_url_path(relative_output))
    }
}

/// Compilation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildOptions {
    /// Expand wildcard imports and discover nested entries
    pub globbing_enabled: bool,
    /// Emit source-location comment annotations
    pub emit_comments: bool,
    /// Output serialization
    pub output_style: OutputStyle,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { globbing_enabled: false, emit_comments: true, output_style: OutputStyle::Expanded }
    }
}

/// Resolve a configuration into its path table and build options.
///
/// Relative directories resolve against `project_root`. Fails when the
/// style-sheet root is not a readable directory, when the output root can be
/// neither used nor created, or when an asset root exists but is not a
/// directory.
pub fn resolve(
    config: &SassConfig,
    project_root: &Path,
) -> Result<(PathConfig, BuildOptions), ConfigError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    let project_root = if project_root.is_absolute() {
        normalize(project_root)
    } else {
        normalize(&std::env::current_dir()?.join(project_root))
    };
    let project_type = config.project_type;

    let sass_dir = dir_or(&config.sass_dir, project_type.default_sass_dir());
    let css_dir = dir_or(&config.css_dir, project_type.default_css_dir());
    let images_dir = dir_or(&config.images_dir, project_type.default_images_dir());
    let generated_images_dir = config.generated_images_dir.clone().unwrap_or_else(|| images_dir.clone());
    let fonts_dir = dir_or(&config.fonts_dir, project_type.default_fonts_dir());

    let http_path = config.http_path.clone().unwrap_or_else(|| "/".to_string());
    let url_for = |dir: &Path| join_url(&http_path, &to_url_path(web_relative(project_type, dir)));
    let http_images_path =
        config.http_images_path.clone().unwrap_or_else(|| url_for(&images_dir));
    let http_generated_images_path =
        config.http_generated_images_path.clone().unwrap_or_else(|| http_images_path.clone());
    let http_fonts_path = config.http_fonts_path.clone().unwrap_or_else(|| url_for(&fonts_dir));
    let http_stylesheets_path =
        config.http_stylesheets_path.clone().unwrap_or_else(|| url_for(&css_dir));

    let paths = PathConfig {
        source_style_root: absolute(&project_root, &sass_dir),
        source_image_root: absolute(&project_root, &images_dir),
        source_generated_image_root: absolute(&project_root, &generated_images_dir),
        source_font_root: absolute(&project_root, &fonts_dir),
        output_style_root: absolute(&project_root, &css_dir),
        output_image_url_prefix: http_images_path,
        output_generated_image_url_prefix: http_generated_images_path,
        output_font_url_prefix: http_fonts_path,
        public_style_prefix: http_stylesheets_path,
        import_paths: config
            .additional_import_paths
            .iter()
            .map(|p| absolute(&project_root, p))
            .collect(),
    };

    check_readable_dir("sass_dir", &paths.source_style_root)?;
    check_writable_or_creatable("css_dir", &paths.output_style_root)?;
    check_optional_dir("images_dir", &paths.source_image_root)?;
    check_optional_dir("generated_images_dir", &paths.source_generated_image_root)?;
    check_optional_dir("fonts_dir", &paths.source_font_root)?;
    for import_path in &paths.import_paths {
        check_optional_dir("additional_import_paths", import_path)?;
    }

    let options = BuildOptions {
        globbing_enabled: config.globbing_enabled(),
        emit_comments: config.line_comments.unwrap_or(true),
        output_style: config.output_style.unwrap_or_default(),
    };

    Ok((paths, options))
}

/// Rails serves `public/` as the web root.
fn web_relative(project_type: ProjectType, dir: &Path) -> &Path {
    match project_type {
        ProjectType::Rails => dir.strip_prefix("public").unwrap_or(dir),
        ProjectType::StandAlone => dir,
    }
}

fn dir_or(value: &Option<PathBuf>, default: &str) -> PathBuf {
    value.clone().unwrap_or_else(|| PathBuf::from(default))
}

fn absolute(root: &Path, path: &Path) -> PathBuf {
    normalize(&root.join(path))
}

/// Lexically normalize a path: drop `.` components and fold `..` into
/// their parent. Symlinks are not resolved.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Join a URL prefix and a relative path with exactly one `/` between them.
pub fn join_url(prefix: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return prefix.to_string();
    }
    format!("{}/{}", prefix.trim_end_matches('/'), path)
}

/// Render a relative filesystem path with `/` separators.
pub fn to_url_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn root_error(role: &'static str, path: &Path, reason: impl Into<String>) -> ConfigError {
    ConfigError::Root { role, path: path.to_path_buf(), reason: reason.into() }
}

fn check_readable_dir(role: &'static str, path: &Path) -> Result<(), ConfigError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(root_error(role, path, "is not a directory")),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(root_error(role, path, "does not exist"))
        }
        Err(e) => return Err(root_error(role, path, format!("cannot be accessed: {}", e))),
    }
    fs::read_dir(path).map_err(|e| root_error(role, path, format!("is not readable: {}", e)))?;
    Ok(())
}

fn check_writable_or_creatable(role: &'static str, path: &Path) -> Result<(), ConfigError> {
    let mut candidate = path;
    loop {
        match fs::metadata(candidate) {
            Ok(meta) => {
                if !meta.is_dir() {
                    let reason = if candidate == path {
                        "is not a directory".to_string()
                    } else {
                        format!("cannot be created: '{}' is not a directory", candidate.display())
                    };
                    return Err(root_error(role, path, reason));
                }
                if meta.permissions().readonly() {
                    return Err(root_error(
                        role,
                        path,
                        format!("is not writable: '{}' is read-only", candidate.display()),
                    ));
                }
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => match candidate.parent() {
                Some(parent) => candidate = parent,
                None => return Err(root_error(role, path, "has no existing ancestor")),
            },
            Err(e) => return Err(root_error(role, path, format!("cannot be accessed: {}", e))),
        }
    }
}

fn check_optional_dir(role: &'static str, path: &Path) -> Result<(), ConfigError> {
    match fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => Err(root_error(role, path, "is not a directory")),
        _ => Ok(()),
    }
}
