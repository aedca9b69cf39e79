//! Sync error types.

use bucketsync_protocol::LocatorError;

/// Errors reported by an [`ObjectStore`](crate::store::ObjectStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no such bucket: {0}")]
    NoSuchBucket(String),

    #[error("no such key: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("delete batch of {0} keys exceeds the store limit")]
    BatchTooLarge(usize),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors produced while planning or executing a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid address: {0}")]
    Locator(#[from] LocatorError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no object store configured for {0}")]
    NoStore(String),

    #[error("failed to walk {path}: {error}")]
    Walk {
        path: String,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to list {locator}: {error}")]
    Listing {
        locator: String,
        #[source]
        error: StoreError,
    },

    #[error("unable to copy {from} -> {to}: {reason}")]
    Copy {
        from: String,
        to: String,
        reason: String,
    },

    #[error("object store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
