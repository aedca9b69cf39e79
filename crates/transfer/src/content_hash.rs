use std::io::Read;
use std::path::Path;

use md5::{Digest, Md5};

use crate::TransferError;

/// Part size used by the store for multi-part uploads: 5 MiB.
pub const PART_SIZE: u64 = 5 * 1024 * 1024;

/// Files strictly larger than this are hashed part by part: 16 MiB.
pub const MULTIPART_THRESHOLD: u64 = 16 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Digest helpers
// ---------------------------------------------------------------------------

/// Computes MD5 of `data` and returns the hex-encoded digest.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Computes the store-style ETag of a local file.
///
/// Small files hash to the plain MD5 hex digest. Larger files follow the
/// multi-part convention: MD5 over the concatenated raw MD5s of each 5 MiB
/// part, suffixed with `-<part count>`.
pub fn content_hash(path: &Path) -> Result<String, TransferError> {
    let file = std::fs::File::open(path)?;
    let size = file.metadata()?.len();
    content_hash_reader(file, size)
}

/// Same as [`content_hash`] for any reader whose total length is `size`.
pub fn content_hash_reader<R: Read>(mut reader: R, size: u64) -> Result<String, TransferError> {
    if size <= MULTIPART_THRESHOLD {
        let mut hasher = Md5::new();
        std::io::copy(&mut reader, &mut hasher)?;
        return Ok(hex::encode(hasher.finalize()));
    }

    let mut outer = Md5::new();
    let mut parts = 0usize;
    loop {
        let mut part = Md5::new();
        let n = std::io::copy(&mut (&mut reader).take(PART_SIZE), &mut part)?;
        if n == 0 {
            break;
        }
        outer.update(part.finalize());
        parts += 1;
        if n < PART_SIZE {
            break;
        }
    }

    Ok(format!("{}-{parts}", hex::encode(outer.finalize())))
}

/// Strips the double quotes stores wrap around ETag values.
pub fn unquote_etag(etag: &str) -> &str {
    etag.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(etag)
}

/// Compares a computed hash with a store-reported (possibly quoted) ETag.
///
/// An empty expected value never matches.
pub fn etag_matches(expected: &str, computed: &str) -> bool {
    let expected = unquote_etag(expected);
    !expected.is_empty() && expected == computed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Deterministic content: byte `i` is `i % 251`.
    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn create_test_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    #[test]
    fn md5_hex_known_vectors() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"hello world"), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn small_file_is_plain_md5() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "a.txt", &pattern(10));
        assert_eq!(
            content_hash(&path).unwrap(),
            "c56bd5480f6e5413cb62a0ad9666613a"
        );
    }

    #[test]
    fn empty_file_hash() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "empty", b"");
        assert_eq!(
            content_hash(&path).unwrap(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn exactly_threshold_takes_single_digest_branch() {
        let data = pattern(MULTIPART_THRESHOLD as usize);
        let hash = content_hash_reader(data.as_slice(), data.len() as u64).unwrap();
        assert_eq!(hash, "3fa26ae9e0a7aa835755bee5ed80ff95");
        assert!(!hash.contains('-'));
    }

    #[test]
    fn one_byte_over_threshold_is_multipart() {
        let data = pattern(MULTIPART_THRESHOLD as usize + 1);
        let hash = content_hash_reader(data.as_slice(), data.len() as u64).unwrap();
        // ceil((16 MiB + 1) / 5 MiB) = 4 parts.
        assert_eq!(hash, "d9afbf30ee403da45ee8565a2b8e2195-4");
    }

    #[test]
    fn exact_part_multiple_does_not_count_empty_part() {
        let data = pattern(4 * PART_SIZE as usize);
        let hash = content_hash_reader(data.as_slice(), data.len() as u64).unwrap();
        assert_eq!(hash, "400d4ca0d30a4dd036b14f8dda2dac11-4");
    }

    #[test]
    fn file_and_reader_agree() {
        let dir = TempDir::new().unwrap();
        let data = pattern(MULTIPART_THRESHOLD as usize + 1);
        let path = create_test_file(dir.path(), "big.bin", &data);
        assert_eq!(
            content_hash(&path).unwrap(),
            content_hash_reader(data.as_slice(), data.len() as u64).unwrap()
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = content_hash(Path::new("/nonexistent/file.bin"));
        assert!(matches!(result, Err(TransferError::Io(_))));
    }

    #[test]
    fn etag_quotes_are_ignored() {
        assert_eq!(unquote_etag("\"abc\""), "abc");
        assert_eq!(unquote_etag("abc"), "abc");
        assert!(etag_matches("\"abc-2\"", "abc-2"));
        assert!(etag_matches("abc", "abc"));
        assert!(!etag_matches("\"abc\"", "abd"));
        assert!(!etag_matches("", ""));
        assert!(!etag_matches("\"\"", ""));
    }
}
