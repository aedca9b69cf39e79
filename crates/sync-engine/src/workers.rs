//! Worker pools draining the action queues.
//!
//! Each worker runs until its queue is closed and drained, then reports
//! what it did. Copy failures end the worker with an error; remove
//! failures are logged and counted.

mod copy;
mod remove;
mod verify;

pub(crate) use copy::copy_worker;
pub(crate) use remove::remove_worker;
pub(crate) use verify::verify_worker;

/// Per-worker counters, summed into the run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct WorkerTally {
    pub copied: u64,
    pub unchanged: u64,
    pub recopied: u64,
    pub removed: u64,
    pub failed_removals: u64,
}

impl WorkerTally {
    pub fn merge(&mut self, other: WorkerTally) {
        self.copied += other.copied;
        self.unchanged += other.unchanged;
        self.recopied += other.recopied;
        self.removed += other.removed;
        self.failed_removals += other.failed_removals;
    }
}

/// Progress delta for `size` bytes.
pub(crate) fn delta(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}
