//! Approximate sliding-window limiter using two fixed counters.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::sink::{ConsoleSink, Level, Sink};

use super::{Limiter, Rate};

/// Width of one counting window.
const WINDOW: Duration = Duration::from_secs(1);

/// A limiter that approximates a sliding window with two counters.
///
/// The current whole-second window keeps a live count; the previous
/// window's final count is blended in, weighted by how much of the
/// current window remains. O(1) space instead of the sliding log's
/// O(rate), trading exactness for it: admission near a window boundary
/// can under- or over-admit relative to a true sliding window. That is
/// the documented approximation, not a bug.
///
/// Single-threaded by construction: `log` takes `&mut self`.
pub struct SlidingWindowCounterLogger<S: Sink = ConsoleSink> {
    rate: Rate,
    sink: S,
    // Monotonic instants carry no absolute epoch, so whole-second
    // flooring is done relative to the construction instant.
    epoch: Instant,
    window_start: Instant,
    last_count: u64,
    current_count: u64,
}

impl SlidingWindowCounterLogger {
    /// Create a limiter emitting to the console.
    pub fn new(logs_per_second: u64) -> Self {
        Self::with_sink(Rate::per_second(logs_per_second), ConsoleSink)
    }
}

impl<S: Sink> SlidingWindowCounterLogger<S> {
    /// Create a limiter emitting to a custom sink.
    pub fn with_sink(rate: Rate, sink: S) -> Self {
        let epoch = Instant::now();
        Self {
            rate,
            sink,
            epoch,
            window_start: epoch,
            last_count: 0,
            current_count: 0,
        }
    }

    /// Roll or reset the counters when the floored clock has moved on.
    ///
    /// An advance of exactly one window promotes the current count; a
    /// larger advance means at least one idle window passed, so both
    /// counts restart from zero rather than carrying stale history.
    fn roll(&mut self, floored_now: Instant) {
        let diff = floored_now.duration_since(self.window_start);
        if diff.is_zero() {
            return;
        }

        self.window_start = floored_now;
        if diff == WINDOW {
            self.last_count = std::mem::take(&mut self.current_count);
        } else {
            debug_assert!(diff > WINDOW);
            self.last_count = 0;
            self.current_count = 0;
        }
    }

    /// Blend the previous window into the current count.
    ///
    /// `fraction` is the position within the current window, in [0, 1).
    /// The blend is truncated to a whole count before comparison.
    fn estimated_load(&self, fraction: f64) -> u64 {
        (self.last_count as f64 * (1.0 - fraction) + self.current_count as f64) as u64
    }

    fn within_limit(&self, fraction: f64) -> bool {
        self.estimated_load(fraction) < self.rate.count_per_second()
    }
}

#[async_trait]
impl<S: Sink + Send> Limiter for SlidingWindowCounterLogger<S> {
    fn log(&mut self, level: Level, message: &str) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.epoch);
        let floored_now = self.epoch + Duration::from_secs(elapsed.as_secs());

        self.roll(floored_now);

        let fraction = f64::from(elapsed.subsec_nanos()) / 1e9;
        if self.within_limit(fraction) && self.sink.log(level, message) {
            self.current_count += 1;
        }
    }
}
