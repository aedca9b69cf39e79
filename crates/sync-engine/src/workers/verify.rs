use bucketsync_protocol::{Action, ResourceLocator};
use bucketsync_transfer::{content_hash, etag_matches};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{WorkerTally, delta};
use crate::copier::Transfers;
use crate::error::SyncError;

/// Hashes a local file off the async runtime. Failures are logged and
/// reported as `None`.
async fn hash_local(locator: &ResourceLocator) -> Option<String> {
    let path = locator.as_local_path().to_path_buf();
    match tokio::task::spawn_blocking(move || content_hash(&path)).await {
        Ok(Ok(hash)) => Some(hash),
        Ok(Err(e)) => {
            warn!(path = %locator, error = %e, "unable to get checksum of local file");
            None
        }
        Err(e) => {
            warn!(path = %locator, error = %e, "checksum task failed");
            None
        }
    }
}

/// Re-checks same-size files by content hash and recopies mismatches.
///
/// The local side is hashed: the source when the destination is an object
/// store, the destination otherwise. A recopy reports `+size` before and
/// `-size` after the transfer.
pub(crate) async fn verify_worker(
    mut queue: mpsc::Receiver<Action>,
    transfers: Transfers,
    progress: mpsc::Sender<i64>,
) -> Result<WorkerTally, SyncError> {
    let mut tally = WorkerTally::default();

    while let Some(action) = queue.recv().await {
        let Some(source) = action.source.as_ref() else {
            continue;
        };
        let destination = &action.destination;
        let local = if destination.is_object_store() {
            source
        } else {
            destination
        };

        // Both sides remote: their ETags already agreed when classified.
        if !local.is_local() {
            tally.unchanged += 1;
            continue;
        }

        let computed = hash_local(local).await;
        let expected = if !action.expected_checksum.is_empty() {
            Some(action.expected_checksum.clone())
        } else if source.is_local() && destination.is_local() {
            hash_local(source).await
        } else {
            None
        };

        let unchanged = match (&expected, &computed) {
            (Some(expected), Some(computed)) => etag_matches(expected, computed),
            _ => false,
        };

        if unchanged {
            debug!(path = %destination, "checksum matches");
            tally.unchanged += 1;
            continue;
        }

        debug!(path = %destination, ?expected, ?computed, "checksum mismatch, recopying");
        let _ = progress.send(delta(action.size)).await;
        transfers.copy(source, destination).await?;
        let _ = progress.send(-delta(action.size)).await;
        tally.recopied += 1;
    }

    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::store::PutOptions;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn local(path: &std::path::Path) -> ResourceLocator {
        ResourceLocator::local(path.to_string_lossy())
    }

    async fn run(actions: Vec<Action>, transfers: Transfers) -> (WorkerTally, Vec<i64>) {
        let (tx, rx) = mpsc::channel(8);
        let (progress_tx, mut progress_rx) = mpsc::channel(8);
        for action in actions {
            tx.send(action).await.unwrap();
        }
        drop(tx);
        let tally = verify_worker(rx, transfers, progress_tx).await.unwrap();
        let mut deltas = Vec::new();
        while let Some(d) = progress_rx.recv().await {
            deltas.push(d);
        }
        (tally, deltas)
    }

    #[tokio::test]
    async fn matching_etag_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, b"hello world").unwrap();

        let store = Arc::new(MemoryStore::new());
        store.insert("b", "a.txt", b"HELLO WORLD".to_vec());
        let transfers = Transfers::new(Some(store.clone()), PutOptions::default(), false);

        let action = Action::verify(
            local(&src),
            "s3://b/a.txt".parse().unwrap(),
            11,
            "\"5eb63bbbe01eeed093cb22bb8f5acdc3\"",
        );
        let (tally, deltas) = run(vec![action], transfers).await;

        assert_eq!(tally.unchanged, 1);
        assert!(deltas.is_empty());
        assert_eq!(store.object("b", "a.txt").unwrap(), b"HELLO WORLD");
    }

    #[tokio::test]
    async fn mismatch_is_recopied_with_progress() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, b"hello world").unwrap();

        let store = Arc::new(MemoryStore::new());
        store.insert("b", "a.txt", b"HELLO WORLD".to_vec());
        let transfers = Transfers::new(Some(store.clone()), PutOptions::default(), false);

        let action = Action::verify(
            local(&src),
            "s3://b/a.txt".parse().unwrap(),
            11,
            "\"ffffffffffffffffffffffffffffffff\"",
        );
        let (tally, deltas) = run(vec![action], transfers).await;

        assert_eq!(tally.recopied, 1);
        assert_eq!(deltas, vec![11, -11]);
        assert_eq!(store.object("b", "a.txt").unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn local_mirror_hashes_both_sides() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let same = dir.path().join("same.txt");
        let differs = dir.path().join("differs.txt");
        fs::write(&src, b"abc").unwrap();
        fs::write(&same, b"abc").unwrap();
        fs::write(&differs, b"xyz").unwrap();

        let transfers = Transfers::new(None, PutOptions::default(), false);
        let actions = vec![
            Action::verify(local(&src), local(&same), 3, ""),
            Action::verify(local(&src), local(&differs), 3, ""),
        ];
        let (tally, _) = run(actions, transfers).await;

        assert_eq!(tally.unchanged, 1);
        assert_eq!(tally.recopied, 1);
        assert_eq!(fs::read(&differs).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn unreadable_local_side_counts_as_mismatch() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.insert("b", "gone.txt", b"abc".to_vec());
        let transfers = Transfers::new(Some(store), PutOptions::default(), false);

        let destination = dir.path().join("gone.txt");
        let action = Action::verify(
            "s3://b/gone.txt".parse().unwrap(),
            local(&destination),
            3,
            "\"900150983cd24fb0d6963f7d28e17f72\"",
        );
        let (tally, deltas) = run(vec![action], transfers).await;

        assert_eq!(tally.recopied, 1);
        assert_eq!(deltas, vec![3, -3]);
        assert_eq!(fs::read(&destination).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn store_to_store_is_not_rehashed() {
        let store = Arc::new(MemoryStore::new());
        let transfers = Transfers::new(Some(store), PutOptions::default(), false);
        let action = Action::verify(
            "s3://a/k".parse().unwrap(),
            "s3://b/k".parse().unwrap(),
            3,
            "\"etag\"",
        );
        let (tally, deltas) = run(vec![action], transfers).await;
        assert_eq!(tally.unchanged, 1);
        assert!(deltas.is_empty());
    }
}
