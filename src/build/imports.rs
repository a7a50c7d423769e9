//! Wildcard `@import` expansion.
//!
//! Rewrites directives such as `@import "partials/*";` into an explicit
//! import of every matching `.scss` file before the source reaches the
//! compiler. The replacement stays on the directive's own line so line
//! numbers in compiler diagnostics still point at the original source.

use crate::build::globbing::{is_glob, DirectoryListing, GlobError, GlobPattern};
use crate::config::to_url_path;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `@import` followed by one or more comma-separated quoted paths.
static IMPORT_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@import\s+((?:"[^"\n]*"|'[^'\n]*')(?:\s*,\s*(?:"[^"\n]*"|'[^'\n]*'))*)\s*;"#)
        .unwrap()
});

/// One quoted path inside an import list.
static QUOTED_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"\n]*)"|'([^'\n]*)'"#).unwrap());

/// Expand wildcard imports in `source`.
///
/// Each wildcard path is resolved against `search_dirs` in order; the first
/// directory with at least one match wins. `exclude` (the importing file)
/// is never imported into itself. Plain paths in the same list are kept as
/// written. A directive left with no paths is removed.
pub fn expand_glob_imports(
    source: &str,
    search_dirs: &[PathBuf],
    exclude: &Path,
    listing: &dyn DirectoryListing,
) -> Result<String, GlobError> {
    let mut failure = None;

    let expanded = IMPORT_DIRECTIVE.replace_all(source, |caps: &Captures<'_>| {
        let items: Vec<(&str, &str)> = QUOTED_PATH
            .captures_iter(&caps[1])
            .filter_map(|item| {
                let path = item.get(1).or_else(|| item.get(2))?;
                Some((item.get(0)?.as_str(), path.as_str()))
            })
            .collect();
        if failure.is_some() || !items.iter().any(|(_, path)| is_glob(path)) {
            return caps[0].to_string();
        }

        let mut imports = Vec::with_capacity(items.len());
        for (raw, path) in items {
            if !is_glob(path) {
                imports.push(raw.to_string());
                continue;
            }
            match resolve_wildcard(path, search_dirs, exclude, listing) {
                Ok(files) if files.is_empty() => {
                    warn!(pattern = path, "wildcard import matched no files");
                }
                Ok(files) => {
                    debug!(pattern = path, count = files.len(), "expanded wildcard import");
                    imports.extend(files.iter().map(|f| format!("\"{}\"", f)));
                }
                Err(e) => {
                    failure = Some(e);
                    return caps[0].to_string();
                }
            }
        }

        if imports.is_empty() {
            String::new()
        } else {
            format!("@import {};", imports.join(", "))
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(expanded.into_owned()),
    }
}

fn resolve_wildcard(
    path: &str,
    search_dirs: &[PathBuf],
    exclude: &Path,
    listing: &dyn DirectoryListing,
) -> Result<Vec<String>, GlobError> {
    let pattern = GlobPattern::new(path)?;
    // "partials/*" means every style sheet in partials, not every file
    let wants_extension = !path.rsplit('/').next().unwrap_or(path).contains('.');

    for dir in search_dirs {
        let matches = match pattern.expand(listing, dir) {
            Ok(matches) => matches,
            // a search directory without the wildcard's parent is not an error
            Err(GlobError::Io { .. }) => continue,
            Err(e) => return Err(e),
        };

        let files: Vec<String> = matches
            .into_iter()
            .filter(|rel| !wants_extension || rel.extension().is_some_and(|e| e == "scss"))
            .filter(|rel| dir.join(rel) != exclude)
            .map(|rel| to_url_path(&rel))
            .collect();

        if !files.is_empty() {
            return Ok(files);
        }
    }
    Ok(Vec::new())
}
