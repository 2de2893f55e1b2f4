// Queue counters (lock-free, read by the admin API)

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct QueueCounters {
    pub enqueued: AtomicU64,
    pub rejected: AtomicU64,
    pub processed: AtomicU64,
    pub failed_attempts: AtomicU64,
    pub retried: AtomicU64,
    pub dropped: AtomicU64,
}

impl QueueCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
