//! Segment-wise glob matching over a pluggable directory listing.
//!
//! Patterns are split on `/`. Each ordinary segment is matched against one
//! directory entry name with [`glob::Pattern`] (`*`, `?`, `[...]`), so `*`
//! never crosses a separator. A `**` segment matches zero or more whole
//! directories.
//!
//! Walking goes through [`DirectoryListing`] so expansion can run against an
//! in-memory tree ([`MemoryListing`]) as well as the real filesystem
//! ([`FsListing`]).

use glob::Pattern;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error while expanding a glob pattern.
#[derive(Debug, Error)]
pub enum GlobError {
    /// A pattern segment is not valid glob syntax
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The full pattern
        pattern: String,
        /// Underlying parse error
        #[source]
        source: glob::PatternError,
    },
    /// Listing a directory failed
    #[error("Cannot list '{}': {source}", .path.display())]
    Io {
        /// Directory being listed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListedEntry {
    /// File or directory name (a single path segment)
    pub name: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

/// Source of directory contents for glob expansion.
pub trait DirectoryListing {
    /// List the immediate children of `dir`.
    fn list(&self, dir: &Path) -> io::Result<Vec<ListedEntry>>;

    /// Canonical identity of `path`, used to deduplicate results.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// [`DirectoryListing`] backed by the real filesystem. Symlinks are followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsListing;

impl DirectoryListing for FsListing {
    fn list(&self, dir: &Path) -> io::Result<Vec<ListedEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            // fs::metadata follows symlinks, unlike DirEntry::file_type
            let is_dir = fs::metadata(entry.path()).map(|m| m.is_dir()).unwrap_or(false);
            entries.push(ListedEntry { name: entry.file_name().to_string_lossy().into_owned(), is_dir });
        }
        Ok(entries)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
}

/// In-memory directory tree.
///
/// Files are registered by path; their ancestor directories are implied.
#[derive(Debug, Clone, Default)]
pub struct MemoryListing {
    dirs: BTreeMap<PathBuf, BTreeSet<ListedEntry>>,
    aliases: BTreeMap<PathBuf, PathBuf>,
}

impl MemoryListing {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file and all of its ancestor directories.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.add(path.as_ref(), false);
        self
    }

    /// Add an (empty) directory and its ancestors.
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.add(path.as_ref(), true);
        self
    }

    /// Register `alias` as another name for the file `target`, like a
    /// symlink. Both names are listed; both canonicalize to `target`.
    pub fn with_alias(mut self, alias: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        self.add(alias.as_ref(), false);
        self.aliases.insert(alias.as_ref().to_path_buf(), target.as_ref().to_path_buf());
        self
    }

    fn add(&mut self, path: &Path, is_dir: bool) {
        if is_dir {
            self.dirs.entry(path.to_path_buf()).or_default();
        }
        let mut child = path;
        let mut child_is_dir = is_dir;
        while let (Some(parent), Some(name)) = (child.parent(), child.file_name()) {
            self.dirs.entry(parent.to_path_buf()).or_default().insert(ListedEntry {
                name: name.to_string_lossy().into_owned(),
                is_dir: child_is_dir,
            });
            child = parent;
            child_is_dir = true;
        }
    }
}

impl DirectoryListing for MemoryListing {
    fn list(&self, dir: &Path) -> io::Result<Vec<ListedEntry>> {
        self.dirs.get(dir).map(|set| set.iter().cloned().collect()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", dir.display()))
        })
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        Ok(self.aliases.get(path).cloned().unwrap_or_else(|| path.to_path_buf()))
    }
}

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    AnyDepth,
    Name(Pattern),
}

impl GlobPattern {
    /// Parse a `/`-separated pattern. Empty and `.` segments are dropped.
    pub fn new(pattern: &str) -> Result<Self, GlobError> {
        let mut segments = Vec::new();
        for raw in pattern.split('/') {
            match raw {
                "" | "." => {}
                "**" => {
                    // consecutive ** are equivalent to one
                    if !matches!(segments.last(), Some(Segment::AnyDepth)) {
                        segments.push(Segment::AnyDepth);
                    }
                }
                _ => {
                    let compiled = Pattern::new(raw).map_err(|source| GlobError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    })?;
                    segments.push(Segment::Name(compiled));
                }
            }
        }
        Ok(Self { segments })
    }

    /// Expand the pattern under `base`, returning matching files as paths
    /// relative to `base`, sorted and deduplicated by canonical path.
    pub fn expand(
        &self,
        listing: &dyn DirectoryListing,
        base: &Path,
    ) -> Result<Vec<PathBuf>, GlobError> {
        let mut found = Vec::new();
        self.walk(listing, base, PathBuf::new(), &self.segments, &mut found)?;

        found.sort();
        // One name per canonical file: the canonical name itself if it was
        // matched, otherwise the lexicographically first alias.
        let mut chosen: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
        for relative in found {
            let full = base.join(&relative);
            let identity = listing.canonicalize(&full).unwrap_or_else(|_| full.clone());
            let is_canonical = identity == full;
            match chosen.entry(identity) {
                Entry::Vacant(slot) => {
                    slot.insert(relative);
                }
                Entry::Occupied(mut slot) => {
                    if is_canonical {
                        slot.insert(relative);
                    }
                }
            }
        }

        let mut result: Vec<PathBuf> = chosen.into_values().collect();
        result.sort();
        Ok(result)
    }

    fn walk(
        &self,
        listing: &dyn DirectoryListing,
        base: &Path,
        relative: PathBuf,
        segments: &[Segment],
        found: &mut Vec<PathBuf>,
    ) -> Result<(), GlobError> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(());
        };

        let dir = base.join(&relative);
        let entries =
            listing.list(&dir).map_err(|source| GlobError::Io { path: dir.clone(), source })?;

        match first {
            Segment::AnyDepth => {
                if rest.is_empty() {
                    // trailing ** matches every file below this point
                    for entry in entries {
                        let child = relative.join(&entry.name);
                        if entry.is_dir {
                            self.walk(listing, base, child, segments, found)?;
                        } else {
                            found.push(child);
                        }
                    }
                } else {
                    self.walk(listing, base, relative.clone(), rest, found)?;
                    for entry in entries.into_iter().filter(|e| e.is_dir) {
                        self.walk(listing, base, relative.join(&entry.name), segments, found)?;
                    }
                }
            }
            Segment::Name(pattern) => {
                for entry in entries {
                    if !pattern.matches(&entry.name) {
                        continue;
                    }
                    let child = relative.join(&entry.name);
                    if rest.is_empty() {
                        if !entry.is_dir {
                            found.push(child);
                        }
                    } else if entry.is_dir {
                        self.walk(listing, base, child, rest, found)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Whether a path string contains glob metacharacters.
pub fn is_glob(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> MemoryListing {
        MemoryListing::new()
            .with_file("/p/sass/screen.scss")
            .with_file("/p/sass/print.scss")
            .with_file("/p/sass/_base.scss")
            .with_file("/p/sass/pages/home.scss")
            .with_file("/p/sass/pages/deep/about.scss")
            .with_file("/p/sass/notes.txt")
            .with_dir("/p/sass/empty")
    }

    fn expand(pattern: &str) -> Vec<String> {
        GlobPattern::new(pattern)
            .unwrap()
            .expand(&tree(), Path::new("/p/sass"))
            .unwrap()
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_star_stays_within_segment() {
        assert_eq!(expand("*.scss"), vec!["_base.scss", "print.scss", "screen.scss"]);
    }

    #[test]
    fn test_double_star_crosses_segments() {
        assert_eq!(
            expand("**/*.scss"),
            vec![
                "_base.scss",
                "pages/deep/about.scss",
                "pages/home.scss",
                "print.scss",
                "screen.scss"
            ]
        );
    }

    #[test]
    fn test_trailing_double_star() {
        assert_eq!(expand("pages/**"), vec!["pages/deep/about.scss", "pages/home.scss"]);
    }

    #[test]
    fn test_directory_prefix() {
        assert_eq!(expand("pages/*"), vec!["pages/home.scss"]);
    }

    #[test]
    fn test_no_match() {
        assert!(expand("*.css").is_empty());
    }

    #[test]
    fn test_missing_base_is_io_error() {
        let err = GlobPattern::new("*.scss")
            .unwrap()
            .expand(&tree(), Path::new("/nowhere"))
            .unwrap_err();
        assert!(matches!(err, GlobError::Io { .. }));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(GlobPattern::new("[.scss"), Err(GlobError::InvalidPattern { .. })));
    }

    #[test]
    fn test_alias_deduplicated() {
        let listing = MemoryListing::new()
            .with_file("/p/a.scss")
            .with_alias("/p/b.scss", "/p/a.scss");
        let found = GlobPattern::new("*.scss").unwrap().expand(&listing, Path::new("/p")).unwrap();
        assert_eq!(found, vec![PathBuf::from("a.scss")]);
    }

    #[test]
    fn test_is_glob() {
        assert!(is_glob("partials/*"));
        assert!(is_glob("a?.scss"));
        assert!(!is_glob("partials/base"));
    }

    #[test]
    fn test_fs_listing() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub/a.scss"), "").unwrap();
        fs::write(temp.path().join("b.scss"), "").unwrap();

        let found =
            GlobPattern::new("**/*.scss").unwrap().expand(&FsListing, temp.path()).unwrap();
        assert_eq!(found, vec![PathBuf::from("b.scss"), PathBuf::from("sub/a.scss")]);
    }
}
