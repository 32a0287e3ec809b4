//! Exact sliding-window limiter backed by a timestamp log.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::sink::{ConsoleSink, Level, Sink};

use super::{Limiter, Rate};

/// Width of the trailing admission window.
const WINDOW: Duration = Duration::from_secs(1);

/// A limiter that keeps one timestamp per admitted message.
///
/// Entries older than the trailing one-second window are evicted before
/// every admission check, so the count of retained timestamps is exactly
/// the number of admissions in the window. Exact, at the cost of O(rate)
/// memory and per-call eviction.
///
/// Single-threaded by construction: `log` takes `&mut self`.
pub struct SlidingLogLogger<S: Sink = ConsoleSink> {
    timestamps: VecDeque<Instant>,
    rate: Rate,
    sink: S,
}

impl SlidingLogLogger {
    /// Create a limiter emitting to the console.
    pub fn new(logs_per_second: u64) -> Self {
        Self::with_sink(Rate::per_second(logs_per_second), ConsoleSink)
    }
}

impl<S: Sink> SlidingLogLogger<S> {
    /// Create a limiter emitting to a custom sink.
    pub fn with_sink(rate: Rate, sink: S) -> Self {
        Self {
            timestamps: VecDeque::new(),
            rate,
            sink,
        }
    }

    /// Number of admissions currently inside the window.
    ///
    /// Stale entries are only removed by [`log`](Limiter::log), so this
    /// is an upper bound between calls.
    pub fn window_count(&self) -> usize {
        self.timestamps.len()
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.timestamps.front() {
            if now.duration_since(*front) > WINDOW {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn within_limit(&self) -> bool {
        (self.timestamps.len() as u64) < self.rate.count_per_second()
    }
}

#[async_trait]
impl<S: Sink + Send> Limiter for SlidingLogLogger<S> {
    fn log(&mut self, level: Level, message: &str) {
        let now = Instant::now();

        self.evict(now);

        // The timestamp is only recorded after a successful write, so a
        // failed emission does not consume quota.
        if self.within_limit() && self.sink.log(level, message) {
            self.timestamps.push_back(now);
        }
    }
}
