//! Directory walking for inventory collection.
//!
//! Produces one record per regular file. Names are the walk root joined
//! with the relative path using `/` separators, so that prefix arithmetic
//! on them matches the root string byte for byte.

use std::path::Path;

/// A regular file found by [`walk_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    /// `root` + `/` + relative path (no doubled separator when `root` ends in `/`).
    pub name: String,
    pub size: u64,
}

/// Walks `root` and returns every regular file below it.
///
/// Directories are descended into only when `recursive` is set; they are
/// never reported themselves. Symlinks and special files are skipped.
pub fn walk_files(root: &Path, recursive: bool) -> std::io::Result<Vec<WalkedFile>> {
    let root_str = root.to_string_lossy().into_owned();
    let mut files = Vec::new();
    walk_dir(root, &root_str, root, recursive, &mut files)?;
    Ok(files)
}

fn walk_dir(
    root: &Path,
    root_str: &str,
    current: &Path,
    recursive: bool,
    files: &mut Vec<WalkedFile>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;

        if metadata.is_dir() {
            if recursive {
                walk_dir(root, root_str, &path, recursive, files)?;
            }
        } else if metadata.is_file() {
            let rel_path = path.strip_prefix(root).map_err(std::io::Error::other)?;
            // Normalize to forward slashes.
            let rel_str = rel_path.to_string_lossy().replace('\\', "/");

            files.push(WalkedFile {
                name: join_name(root_str, &rel_str),
                size: metadata.len(),
            });
        }
    }

    Ok(())
}

/// Joins a root string and a relative path with exactly one `/`.
pub fn join_name(root: &str, relative: &str) -> String {
    if root.is_empty() {
        relative.to_string()
    } else if root.ends_with('/') {
        format!("{root}{relative}")
    } else {
        format!("{root}/{relative}")
    }
}
