use std::sync::Arc;

use bucketsync_protocol::Action;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use super::{WorkerTally, delta};
use crate::copier::Transfers;
use crate::error::SyncError;

/// Pulls copy actions from the shared queue until it is closed.
///
/// Each finished copy reports `-size` to the progress channel. The first
/// failed copy ends the worker with that error.
pub(crate) async fn copy_worker(
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Action>>>,
    transfers: Transfers,
    progress: mpsc::Sender<i64>,
) -> Result<WorkerTally, SyncError> {
    let mut tally = WorkerTally::default();

    loop {
        let next = queue.lock().await.recv().await;
        let Some(action) = next else {
            break;
        };
        let Some(source) = action.source.as_ref() else {
            continue;
        };

        transfers.copy(source, &action.destination).await?;
        tally.copied += 1;
        let _ = progress.send(-delta(action.size)).await;
    }

    debug!(worker = id, copied = tally.copied, "copy worker finished");
    Ok(tally)
}
