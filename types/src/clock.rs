//! Clock abstraction.
//!
//! Anything that needs "now" takes a [`Clock`] instead of reading the system
//! time directly, so the accrual display can be driven by a deterministic
//! clock in tests.

use crate::time::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_past_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now() > Timestamp::from_secs(1_577_836_800));
    }
}
