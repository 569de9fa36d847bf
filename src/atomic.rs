//! Atomic file replacement for crash safety.
//!
//! Content is written to a temporary file in the destination directory, synced, and
//! renamed over the target. A crash at any point leaves either the previous file or
//! the new one on disk, never a truncated mix.

use crate::error::StorageError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Atomically replace `path` with `contents`, creating parent directories on demand.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if path.file_name().is_none() {
        return Err(StorageError::InvalidPath(format!(
            "{} has no file name",
            path.display()
        )));
    }

    std::fs::create_dir_all(parent).map_err(|e| StorageError::at(parent, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| StorageError::at(parent, e))?;
    temp.write_all(contents)
        .map_err(|e| StorageError::at(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| StorageError::at(temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| StorageError::at(path, e.error))?;

    debug!("Atomically wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
