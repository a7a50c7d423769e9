//! Output writing with rename-into-place.
//!
//! Each artifact is written to a temporary file in its destination
//! directory and renamed over the destination only after a successful
//! flush, so readers never observe a partially written style sheet. The
//! temporary file is deleted by its drop guard on every failure path.

use crate::build::CompiledArtifact;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Writing one artifact failed.
#[derive(Debug, Error)]
#[error("Failed to write {}: {source}", .path.display())]
pub struct WriteError {
    /// Destination path
    pub path: PathBuf,
    /// Underlying IO error
    #[source]
    pub source: io::Error,
}

/// Write an artifact to its destination, creating directories as needed.
pub fn write_artifact(artifact: &CompiledArtifact) -> Result<PathBuf, WriteError> {
    atomic_write(&artifact.destination_path, &artifact.bytes)?;
    debug!(path = %artifact.destination_path.display(), bytes = artifact.bytes.len(), "wrote artifact");
    Ok(artifact.destination_path.clone())
}

/// Atomically replace `path` with `content`.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), WriteError> {
    let fail = |source: io::Error| WriteError { path: path.to_path_buf(), source };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(fail)?;

    let mut temp = NamedTempFile::new_in(parent).map_err(fail)?;
    temp.write_all(content).map_err(fail)?;
    set_publish_permissions(temp.as_file(), path).map_err(fail)?;
    temp.as_file_mut().sync_all().map_err(fail)?;
    temp.persist(path).map_err(|e| fail(e.error))?;
    Ok(())
}

/// Mode for newly published files; existing outputs keep their own mode.
#[cfg(unix)]
const PUBLISH_MODE: u32 = 0o644;

/// Temp files are created owner-only, so widen them before they replace the
/// destination.
#[cfg(unix)]
fn set_publish_permissions(file: &fs::File, destination: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = match fs::metadata(destination) {
        Ok(meta) if meta.is_file() => meta.permissions().mode() & 0o7777,
        _ => PUBLISH_MODE,
    };
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_publish_permissions(_file: &fs::File, _destination: &Path) -> io::Result<()> {
    Ok(())
}
