//! The artifact success predicate and the file shuffling around it.
//!
//! Tools exit 0 while failing to render often enough that an exit status
//! proves nothing. An attempt only counts when, afterwards, the target file
//! exists and is non-empty.

use crate::error::AttemptError;
use std::path::Path;
use tracing::debug;

/// Succeeds with the artifact size iff `path` exists and is non-empty.
pub fn verify(path: &Path) -> Result<u64, AttemptError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
        Ok(meta) if meta.is_file() => Err(AttemptError::OutputEmpty {
            path: path.to_path_buf(),
        }),
        _ => Err(AttemptError::OutputMissing {
            path: path.to_path_buf(),
        }),
    }
}

/// `true` iff [`verify`] would succeed.
pub fn is_valid(path: &Path) -> bool {
    verify(path).is_ok()
}

/// `true` iff `path` is valid and was written no earlier than `source` was
/// last modified. Used to decide whether an intermediate left by another
/// strategy may be reused.
pub fn is_fresh(path: &Path, source: &Path) -> bool {
    if !is_valid(path) {
        return false;
    }
    let modified = |p: &Path| std::fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(path), modified(source)) {
        (Some(made), Some(edited)) => made >= edited,
        _ => false,
    }
}

/// Remove a leftover file at `path` so only a fresh artifact can pass
/// [`verify`]. A missing file is fine.
pub fn clear_stale(path: &Path) -> Result<(), AttemptError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed stale artifact {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AttemptError::io(path, e)),
    }
}

/// Move a tool's output from where the tool wrote it onto `target`.
///
/// No-op when the paths are the same. Falls back to copy + remove when a
/// rename is impossible (different filesystems).
pub fn settle(produced: &Path, target: &Path) -> Result<(), AttemptError> {
    if produced == target {
        return Ok(());
    }
    verify(produced)?;
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| AttemptError::io(parent, e))?;
        }
    }
    if std::fs::rename(produced, target).is_err() {
        std::fs::copy(produced, target).map_err(|e| AttemptError::io(target, e))?;
        std::fs::remove_file(produced).map_err(|e| AttemptError::io(produced, e))?;
    }
    debug!("Moved {} → {}", produced.display(), target.display());
    Ok(())
}
