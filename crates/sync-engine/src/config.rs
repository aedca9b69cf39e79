//! Run configuration.
//!
//! Deserializable from TOML; every field has a default so partial files work.

use std::fmt;

use bucketsync_protocol::StorageClass;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Number of copy workers when nothing else is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Immutable settings for one sync run.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub secret_key: String,

    /// Storage class applied to uploads.
    #[serde(default)]
    pub storage_class: StorageClass,

    /// Number of parallel copy workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Multi-part upload part size hint in MiB (0 = store default).
    #[serde(default)]
    pub part_size: u64,

    /// Compare content hashes when sizes match.
    #[serde(default)]
    pub check_content_hash: bool,

    /// Compute and report actions without touching the destination.
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub verbose: bool,

    /// Descend into subdirectories / nested keys.
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Accepted for compatibility; does not change classification.
    #[serde(default)]
    pub force: bool,

    /// Accepted for compatibility; does not change classification.
    #[serde(default)]
    pub skip_existing: bool,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_true() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            storage_class: StorageClass::default(),
            concurrency: default_concurrency(),
            part_size: 0,
            check_content_hash: false,
            dry_run: false,
            verbose: false,
            recursive: default_true(),
            force: false,
            skip_existing: false,
        }
    }
}

impl SyncConfig {
    /// Rejects settings the worker pools cannot run with.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.concurrency == 0 {
            return Err(SyncError::Config("concurrency must be at least 1".into()));
        }
        Ok(())
    }

    /// Part size hint in bytes (0 = store default).
    pub fn part_size_bytes(&self) -> u64 {
        self.part_size.saturating_mul(1024 * 1024)
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("access_key", &self.access_key)
            .field(
                "secret_key",
                &if self.secret_key.is_empty() { "" } else { "<redacted>" },
            )
            .field("storage_class", &self.storage_class)
            .field("concurrency", &self.concurrency)
            .field("part_size", &self.part_size)
            .field("check_content_hash", &self.check_content_hash)
            .field("dry_run", &self.dry_run)
            .field("verbose", &self.verbose)
            .field("recursive", &self.recursive)
            .field("force", &self.force)
            .field("skip_existing", &self.skip_existing)
            .finish()
    }
}
