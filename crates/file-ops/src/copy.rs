//! Local file writes used by copy workers.

use std::path::Path;

/// Copies `src` over `dst`, creating missing parent directories.
///
/// Returns the number of bytes copied.
pub fn copy_file(src: &Path, dst: &Path) -> std::io::Result<u64> {
    ensure_parent(dst)?;
    std::fs::copy(src, dst)
}

/// Writes `data` to `dst`, creating missing parent directories.
pub fn write_file(dst: &Path, data: &[u8]) -> std::io::Result<()> {
    ensure_parent(dst)?;
    std::fs::write(dst, data)
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copy_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        std::fs::write(&src, b"0123456789").unwrap();

        let dst = dir.path().join("out").join("nested").join("a.txt");
        let n = copy_file(&src, &dst).unwrap();

        assert_eq!(n, 10);
        assert_eq!(std::fs::read(&dst).unwrap(), b"0123456789");
    }

    #[test]
    fn copy_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("new.txt");
        let dst = dir.path().join("old.txt");
        std::fs::write(&src, b"fresh").unwrap();
        std::fs::write(&dst, b"stale content").unwrap();

        copy_file(&src, &dst).unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"fresh");
    }

    #[test]
    fn copy_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = copy_file(&dir.path().join("missing"), &dir.path().join("dst"));
        assert!(result.is_err());
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("a").join("b").join("c.bin");
        write_file(&dst, b"data").unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"data");
    }

    #[test]
    fn write_relative_file_without_parent() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("plain.bin");
        write_file(&dst, b"x").unwrap();
        assert!(dst.exists());
    }
}
