//! Asset URL rewriting.
//!
//! Compiled CSS refers to images and fonts by their local source paths.
//! [`UrlRewriter`] maps every `url(...)` that points into a source asset root
//! onto that root's published URL prefix. Published URLs are absolute, so a
//! second pass finds nothing left to rewrite.

use crate::config::{join_url, normalize, to_url_path, PathConfig};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

/// `url(...)` with a double-quoted, single-quoted or bare argument.
static URL_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"\s]*))\s*\)"#).unwrap()
});

/// A local asset root and where its files are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRole {
    /// Absolute source directory
    pub root: PathBuf,
    /// Published URL prefix
    pub prefix: String,
}

/// Rewrites local asset references to published URLs.
#[derive(Debug, Clone)]
pub struct UrlRewriter {
    roles: Vec<AssetRole>,
}

impl UrlRewriter {
    /// Create a rewriter for images, generated images and fonts, tried in
    /// that order.
    pub fn new(paths: &PathConfig) -> Self {
        Self::with_roles(vec![
            AssetRole {
                root: paths.source_image_root.clone(),
                prefix: paths.output_image_url_prefix.clone(),
            },
            AssetRole {
                root: paths.source_generated_image_root.clone(),
                prefix: paths.output_generated_image_url_prefix.clone(),
            },
            AssetRole {
                root: paths.source_font_root.clone(),
                prefix: paths.output_font_url_prefix.clone(),
            },
        ])
    }

    /// Create a rewriter from explicit roles.
    pub fn with_roles(roles: Vec<AssetRole>) -> Self {
        Self { roles }
    }

    /// Rewrite CSS bytes. Input that is not UTF-8 is returned unchanged.
    pub fn rewrite_bytes(&self, bytes: Vec<u8>) -> Vec<u8> {
        match String::from_utf8(bytes) {
            Ok(css) => {
                let rewritten = match self.rewrite(&css) {
                    Cow::Borrowed(_) => None,
                    Cow::Owned(rewritten) => Some(rewritten),
                };
                rewritten.unwrap_or(css).into_bytes()
            }
            Err(e) => e.into_bytes(),
        }
    }

    /// Rewrite every local `url(...)` reference in `css`.
    pub fn rewrite<'a>(&self, css: &'a str) -> Cow<'a, str> {
        URL_REFERENCE.replace_all(css, |caps: &Captures<'_>| {
            let (target, quote) = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(m), _, _) => (m.as_str(), "\""),
                (_, Some(m), _) => (m.as_str(), "'"),
                (_, _, Some(m)) => (m.as_str(), ""),
                _ => return caps[0].to_string(),
            };
            match self.publish(target) {
                Some(url) => format!("url({quote}{url}{quote})"),
                None => caps[0].to_string(),
            }
        })
    }

    /// Published URL for a reference, or `None` when it is not local.
    pub fn publish(&self, reference: &str) -> Option<String> {
        let split = reference.find(['?', '#']).unwrap_or(reference.len());
        let (path, suffix) = reference.split_at(split);
        if !is_local_reference(path) {
            return None;
        }

        let candidate = Path::new(path);
        self.roles.iter().find_map(|role| {
            let relative = role.locate(candidate)?;
            Some(format!("{}{}", join_url(&role.prefix, &to_url_path(&relative)), suffix))
        })
    }
}

impl AssetRole {
    /// Path of `reference` relative to this role's root, if it lies there.
    fn locate(&self, reference: &Path) -> Option<PathBuf> {
        if reference.is_absolute() {
            let normalized = normalize(reference);
            return normalized.strip_prefix(&self.root).ok().map(Path::to_path_buf);
        }

        // "../images/logo.png" from a style sheet still names images/logo.png
        let relative: PathBuf = reference
            .components()
            .skip_while(|c| matches!(c, Component::CurDir | Component::ParentDir))
            .collect();
        if relative.as_os_str().is_empty() {
            return None;
        }

        if self.root.join(&relative).is_file() {
            return Some(relative);
        }

        let root_name = self.root.file_name()?;
        let mut components = relative.components();
        if components.next() == Some(Component::Normal(root_name)) {
            let rest = components.as_path();
            if !rest.as_os_str().is_empty() && self.root.join(rest).is_file() {
                return Some(rest.to_path_buf());
            }
        }
        None
    }
}

/// Whether a reference could name a local file: no scheme, not
/// protocol-relative, not a data URI and not a bare fragment.
fn is_local_reference(path: &str) -> bool {
    if path.is_empty() || path.starts_with("//") || path.starts_with('#') {
        return false;
    }
    let lower = path.to_ascii_lowercase();
    if lower.starts_with("data:") {
        return false;
    }
    // "https:", "mailto:" but not "C:\"
    match path.find(':') {
        Some(i) => i == 1 && path.as_bytes()[0].is_ascii_alphabetic() && path[2..].starts_with(['\\', '/']),
        None => true,
    }
}
