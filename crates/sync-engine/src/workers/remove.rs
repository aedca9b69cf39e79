use std::sync::Arc;

use bucketsync_file_ops::remove_file_best_effort;
use bucketsync_protocol::Action;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::WorkerTally;
use crate::error::SyncError;
use crate::store::{MAX_DELETE_BATCH, ObjectStore};

/// Keys waiting for one bulk delete, all from the same bucket.
#[derive(Default)]
struct PendingBatch {
    bucket: String,
    keys: Vec<String>,
}

impl PendingBatch {
    async fn flush(&mut self, store: Option<&dyn ObjectStore>, tally: &mut WorkerTally) {
        if self.keys.is_empty() {
            return;
        }
        let keys = std::mem::take(&mut self.keys);
        let count = keys.len() as u64;

        let Some(store) = store else {
            warn!(bucket = %self.bucket, count, "no object store configured, skipping bulk delete");
            tally.failed_removals += count;
            return;
        };

        match store.delete_batch(&self.bucket, keys).await {
            Ok(()) => {
                debug!(bucket = %self.bucket, count, "bulk delete");
                tally.removed += count;
            }
            Err(e) => {
                warn!(bucket = %self.bucket, count, error = %e, "bulk delete failed");
                tally.failed_removals += count;
            }
        }
    }
}

/// Deletes destination-only files.
///
/// Local files are removed one by one; object keys are collected and
/// deleted in bulk batches of at most [`MAX_DELETE_BATCH`], with the
/// final partial batch flushed when the queue closes. Failures are logged
/// and never end the worker.
pub(crate) async fn remove_worker(
    mut queue: mpsc::Receiver<Action>,
    store: Option<Arc<dyn ObjectStore>>,
    dry_run: bool,
    verbose: bool,
) -> Result<WorkerTally, SyncError> {
    let mut tally = WorkerTally::default();
    let mut batch = PendingBatch::default();
    let store = store.as_deref();

    while let Some(action) = queue.recv().await {
        let target = action.destination;
        if verbose {
            info!("Remove {target}");
        }
        if dry_run {
            debug!(path = %target, "dry-run: remove skipped");
            continue;
        }

        if target.is_local() {
            if remove_file_best_effort(target.as_local_path()) {
                tally.removed += 1;
            } else {
                tally.failed_removals += 1;
            }
            continue;
        }

        if batch.bucket != target.bucket() {
            batch.flush(store, &mut tally).await;
            batch.bucket = target.bucket().to_string();
        }
        batch.keys.push(target.key().to_string());
        if batch.keys.len() >= MAX_DELETE_BATCH {
            batch.flush(store, &mut tally).await;
        }
    }

    batch.flush(store, &mut tally).await;
    Ok(tally)
}
