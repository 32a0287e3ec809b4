//! Admission rate configuration.

use std::time::Duration;

/// An admission rate, normalized to a count per second.
///
/// Immutable after construction. A zero rate is representable (so that
/// configuration can be inspected before validation) but asking a zero
/// rate for its [`interval`](Rate::interval) is a programming error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    count_per_second: u64,
}

impl Rate {
    /// Create a rate of `count` admissions per second.
    pub fn per_second(count: u64) -> Self {
        Self {
            count_per_second: count,
        }
    }

    /// Create a rate of `count` admissions per `unit`.
    ///
    /// The unit must be a whole number of seconds; the count is
    /// normalized with integer division, so `Rate::new(90, 60s)` is one
    /// per second.
    pub fn new(count: u64, unit: Duration) -> Self {
        let unit_secs = unit.as_secs();
        assert!(unit_secs > 0, "rate unit must be at least one second");
        Self {
            count_per_second: count / unit_secs,
        }
    }

    /// The normalized per-second count.
    pub fn count_per_second(&self) -> u64 {
        self.count_per_second
    }

    /// The minimum spacing between admissions at this rate.
    ///
    /// Panics on a zero rate: validate configuration before asking for
    /// an interval.
    pub fn interval(&self) -> Duration {
        assert!(
            self.count_per_second > 0,
            "interval is undefined for a zero rate"
        );
        Duration::from_micros(1_000_000 / self.count_per_second)
    }
}
