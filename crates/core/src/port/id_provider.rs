// ID Provider Port (for deterministic testing)

use std::sync::atomic::{AtomicI64, Ordering};

/// ID provider interface (allows deterministic IDs in tests)
pub trait IdProvider: Send + Sync {
    /// Generate a new unique message ID
    fn generate_id(&self) -> String;
}

/// Nanosecond clock ID provider (production).
///
/// IDs are strictly increasing within a process even when the wall clock
/// repeats a value or steps backwards.
#[derive(Debug, Default)]
pub struct ClockIdProvider {
    last: AtomicI64,
}

impl ClockIdProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> i64 {
        let now = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(i64::MAX);
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

impl IdProvider for ClockIdProvider {
    fn generate_id(&self) -> String {
        self.next().to_string()
    }
}

/// UUID v4 provider
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
