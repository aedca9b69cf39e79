//! Content hashing compatible with object-store ETags, plus the live
//! progress line shown while a sync runs.

mod content_hash;
mod progress;

pub use content_hash::{
    MULTIPART_THRESHOLD, PART_SIZE, content_hash, content_hash_reader, etag_matches, md5_hex,
    unquote_etag,
};
pub use progress::{ProgressAggregator, ProgressState, humanize};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
