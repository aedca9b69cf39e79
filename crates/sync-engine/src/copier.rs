//! File and object transfers between any two locators.

use std::sync::Arc;

use bucketsync_file_ops::{copy_file, write_file};
use bucketsync_protocol::ResourceLocator;
use tracing::{debug, info};

use crate::error::SyncError;
use crate::store::{ObjectStore, PutOptions};

/// Performs single-file copies for the copy and verify workers.
#[derive(Clone)]
pub struct Transfers {
    store: Option<Arc<dyn ObjectStore>>,
    put_options: PutOptions,
    dry_run: bool,
}

impl Transfers {
    pub fn new(store: Option<Arc<dyn ObjectStore>>, put_options: PutOptions, dry_run: bool) -> Self {
        Self {
            store,
            put_options,
            dry_run,
        }
    }

    fn store_for(&self, locator: &ResourceLocator) -> Result<&dyn ObjectStore, SyncError> {
        self.store
            .as_deref()
            .ok_or_else(|| SyncError::NoStore(locator.to_string()))
    }

    /// Copies `src` to `dst`, creating local parent directories as needed.
    ///
    /// Returns the number of bytes written. Under dry-run nothing is touched
    /// and 0 is returned.
    pub async fn copy(&self, src: &ResourceLocator, dst: &ResourceLocator) -> Result<u64, SyncError> {
        if self.dry_run {
            info!("dry-run: copy {src} -> {dst}");
            return Ok(0);
        }

        let copy_error = |reason: String| SyncError::Copy {
            from: src.to_string(),
            to: dst.to_string(),
            reason,
        };

        let written = match (src.is_local(), dst.is_local()) {
            (true, true) => {
                let from = src.as_local_path().to_path_buf();
                let to = dst.as_local_path().to_path_buf();
                tokio::task::spawn_blocking(move || copy_file(&from, &to))
                    .await?
                    .map_err(|e| copy_error(e.to_string()))?
            }
            (true, false) => {
                let store = self.store_for(dst)?;
                let body = tokio::fs::read(src.as_local_path())
                    .await
                    .map_err(|e| copy_error(e.to_string()))?;
                let len = body.len() as u64;
                store
                    .put(dst.bucket(), dst.key(), body, self.put_options)
                    .await
                    .map_err(|e| copy_error(e.to_string()))?;
                len
            }
            (false, true) => {
                let store = self.store_for(src)?;
                let body = store
                    .get(src.bucket(), src.key())
                    .await
                    .map_err(|e| copy_error(e.to_string()))?;
                let len = body.len() as u64;
                let to = dst.as_local_path().to_path_buf();
                tokio::task::spawn_blocking(move || write_file(&to, &body))
                    .await?
                    .map_err(|e| copy_error(e.to_string()))?;
                len
            }
            (false, false) => {
                let store = self.store_for(src)?;
                let body = store
                    .get(src.bucket(), src.key())
                    .await
                    .map_err(|e| copy_error(e.to_string()))?;
                let len = body.len() as u64;
                store
                    .put(dst.bucket(), dst.key(), body, self.put_options)
                    .await
                    .map_err(|e| copy_error(e.to_string()))?;
                len
            }
        };

        debug!(from = %src, to = %dst, bytes = written, "copied");
        Ok(written)
    }
}
