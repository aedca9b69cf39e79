//! Sync orchestrator.
//!
//! Builds both inventories, classifies the differences, then feeds the
//! actions to the worker pools while the progress aggregator repaints the
//! status line. The run completes once every worker has drained its queue.

use std::io::Write;
use std::sync::Arc;

use bucketsync_protocol::{ActionKind, ResourceLocator};
use bucketsync_transfer::ProgressAggregator;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::classify::{Plan, classify};
use crate::config::SyncConfig;
use crate::copier::Transfers;
use crate::error::SyncError;
use crate::inventory::collect;
use crate::store::{ObjectStore, PutOptions};
use crate::workers::{WorkerTally, copy_worker, delta, remove_worker, verify_worker};

/// Capacity of each action queue.
pub const QUEUE_SIZE: usize = 1_000_000;

/// Capacity of the progress delta channel.
pub const PROGRESS_BUFFER: usize = 64;

/// Outcome of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub considered: u64,
    pub estimated_bytes: u64,
    pub copied: u64,
    /// Same-size files whose content hash matched.
    pub unchanged: u64,
    /// Same-size files recopied after a hash mismatch.
    pub recopied: u64,
    pub removed: u64,
    pub failed_removals: u64,
    pub dry_run: bool,
}

/// Parses a source address.
pub fn parse_source(address: &str) -> Result<ResourceLocator, SyncError> {
    Ok(address.parse()?)
}

/// Parses a destination address; an empty path means the root.
pub fn parse_destination(address: &str) -> Result<ResourceLocator, SyncError> {
    Ok(address.parse::<ResourceLocator>()?.or_root())
}

/// One-way mirror from a source tree or prefix to a destination.
pub struct SyncEngine {
    config: SyncConfig,
    store: Option<Arc<dyn ObjectStore>>,
}

impl SyncEngine {
    /// Creates an engine without an object store; only local paths work.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            store: None,
        }
    }

    /// Attaches the object store used for every `s3://` locator.
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn require_store(&self, locator: &ResourceLocator) -> Result<(), SyncError> {
        if locator.is_object_store() && self.store.is_none() {
            return Err(SyncError::NoStore(locator.to_string()));
        }
        Ok(())
    }

    /// Inventories both sides and classifies every difference.
    pub async fn plan(
        &self,
        source: &ResourceLocator,
        destination: &ResourceLocator,
    ) -> Result<Plan, SyncError> {
        self.config.validate()?;
        self.require_store(source)?;
        self.require_store(destination)?;

        let store = self.store.as_deref();
        let inventories = collect(source, destination, self.config.recursive, store).await?;
        let plan = classify(
            &inventories.source,
            &inventories.destination,
            source,
            destination,
            self.config.check_content_hash,
        );

        info!(
            source = %source,
            destination = %destination,
            considered = plan.considered,
            estimated_bytes = plan.estimated_bytes,
            copies = plan.count(ActionKind::Copy),
            verifies = plan.count(ActionKind::VerifyChecksum),
            removes = plan.count(ActionKind::Remove),
            "sync planned"
        );
        Ok(plan)
    }

    /// Runs `plan` through the worker pools, painting progress on `progress_out`.
    ///
    /// Returns on the first failed copy; the remaining workers are aborted.
    pub async fn execute<W>(&self, plan: Plan, progress_out: W) -> Result<SyncReport, SyncError>
    where
        W: Write + Send + 'static,
    {
        let config = &self.config;
        config.validate()?;

        let (progress_tx, progress_rx) = mpsc::channel::<i64>(PROGRESS_BUFFER);
        let aggregator = tokio::task::spawn_blocking(move || {
            ProgressAggregator::new(progress_out).run(progress_rx)
        });

        let transfers = Transfers::new(
            self.store.clone(),
            PutOptions {
                storage_class: config.storage_class,
                part_size: config.part_size_bytes(),
            },
            config.dry_run,
        );

        let (copy_tx, copy_rx) = mpsc::channel(QUEUE_SIZE);
        let (verify_tx, verify_rx) = mpsc::channel(QUEUE_SIZE);
        let (remove_tx, remove_rx) = mpsc::channel(QUEUE_SIZE);

        let mut workers = JoinSet::new();
        workers.spawn(remove_worker(
            remove_rx,
            self.store.clone(),
            config.dry_run,
            config.verbose,
        ));
        workers.spawn(verify_worker(verify_rx, transfers.clone(), progress_tx.clone()));
        let copy_rx = Arc::new(Mutex::new(copy_rx));
        for id in 0..config.concurrency {
            workers.spawn(copy_worker(
                id,
                copy_rx.clone(),
                transfers.clone(),
                progress_tx.clone(),
            ));
        }
        drop(copy_rx);

        for action in plan.actions {
            let queued = match action.kind {
                ActionKind::Copy => {
                    let _ = progress_tx.send(delta(action.size)).await;
                    copy_tx.send(action).await.is_ok()
                }
                ActionKind::VerifyChecksum => verify_tx.send(action).await.is_ok(),
                ActionKind::Remove => remove_tx.send(action).await.is_ok(),
            };
            // A closed queue means its workers stopped early; the join
            // below reports why.
            if !queued {
                debug!("action queue closed early, stopping dispatch");
                break;
            }
        }
        drop(copy_tx);
        drop(verify_tx);
        drop(remove_tx);

        let mut tally = WorkerTally::default();
        while let Some(joined) = workers.join_next().await {
            tally.merge(joined??);
        }

        drop(progress_tx);
        aggregator.await??;

        let report = SyncReport {
            considered: plan.considered,
            estimated_bytes: plan.estimated_bytes,
            copied: tally.copied,
            unchanged: tally.unchanged,
            recopied: tally.recopied,
            removed: tally.removed,
            failed_removals: tally.failed_removals,
            dry_run: config.dry_run,
        };
        info!(?report, "sync finished");
        Ok(report)
    }

    /// Parses both addresses, plans and executes in one go.
    pub async fn run<W>(
        &self,
        source: &str,
        destination: &str,
        progress_out: W,
    ) -> Result<SyncReport, SyncError>
    where
        W: Write + Send + 'static,
    {
        let source = parse_source(source)?;
        let destination = parse_destination(destination)?;
        let plan = self.plan(&source, &destination).await?;
        self.execute(plan, progress_out).await
    }
}
