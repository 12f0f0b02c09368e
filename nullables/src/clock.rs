//! Nullable clock: deterministic time for testing.

use edumine_types::{Clock, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to.
#[derive(Debug)]
pub struct NullClock {
    current_ms: AtomicU64,
}

impl NullClock {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            current_ms: AtomicU64::new(initial.as_millis()),
        }
    }

    /// Advance time by a duration.
    pub fn advance(&self, by: Duration) {
        let millis = by.as_millis().min(u64::MAX as u128) as u64;
        self.current_ms.fetch_add(millis, Ordering::SeqCst);
    }

    /// Set the time to a specific value.
    pub fn set(&self, to: Timestamp) {
        self.current_ms.store(to.as_millis(), Ordering::SeqCst);
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.current_ms.load(Ordering::SeqCst))
    }
}
