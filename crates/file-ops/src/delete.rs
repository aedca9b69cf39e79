//! Best-effort deletion of destination files.

use std::path::Path;

/// Removes a single file, logging instead of failing.
///
/// A file that cannot be removed only leaves stale data behind, so errors
/// are reported at warn level and swallowed. Returns whether the file was removed.
pub fn remove_file_best_effort(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed file");
            true
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove file");
            false
        }
    }
}
