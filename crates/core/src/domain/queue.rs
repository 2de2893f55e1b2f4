// Queue Domain Model

use serde::Serialize;
use std::time::Duration;

/// Default number of parallel workers
pub const DEFAULT_WORKER_COUNT: usize = 3;

/// Default bounded buffer capacity
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default number of retries after the first failed attempt
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Default delay before a failed message is re-admitted (5s)
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Queue configuration, immutable once the queue is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub worker_count: usize,
    pub capacity: usize,
    pub retry_limit: u32,
    pub retry_delay: Duration,
}

impl QueueConfig {
    pub fn new(worker_count: usize, capacity: usize) -> Self {
        Self {
            worker_count,
            capacity,
            ..Default::default()
        }
    }

    pub fn with_retry(mut self, retry_limit: u32, retry_delay: Duration) -> Self {
        self.retry_limit = retry_limit;
        self.retry_delay = retry_delay;
        self
    }

    /// Replace zero values with defaults (worker count, capacity, retry delay)
    pub fn normalized(mut self) -> Self {
        if self.worker_count == 0 {
            self.worker_count = DEFAULT_WORKER_COUNT;
        }
        if self.capacity == 0 {
            self.capacity = DEFAULT_CAPACITY;
        }
        if self.retry_delay.is_zero() {
            self.retry_delay = DEFAULT_RETRY_DELAY;
        }
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            capacity: DEFAULT_CAPACITY,
            retry_limit: DEFAULT_RETRY_LIMIT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Point-in-time view of the queue, used by the admin API
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub running: bool,
    pub worker_count: usize,
    pub capacity: usize,
    pub pending: usize,
    pub registered_types: Vec<String>,
    pub enqueued: u64,
    pub rejected: u64,
    pub processed: u64,
    pub failed_attempts: u64,
    pub retried: u64,
    pub dropped: u64,
}
