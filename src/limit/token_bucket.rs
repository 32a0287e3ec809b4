//! Token-bucket limiter with refundable permits.

use std::sync::{Arc, Weak};
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::sink::{ConsoleSink, Level, Sink};

use super::{Limiter, Rate};

/// The pool of available tokens, shared between the limiter and any
/// outstanding permits.
type TokenCell = Mutex<u64>;

/// A unit of admitted throughput.
///
/// A valid permit represents exactly one token removed from the pool.
/// Calling [`release`](Permit::release) gives the token back; a permit
/// that is simply dropped keeps the token consumed. An empty permit
/// (fetched when the pool was exhausted) holds no pool reference and can
/// never refund.
///
/// The pool is held through a [`Weak`] reference, so a permit may
/// outlive its limiter; a refund against a gone pool is a no-op.
#[derive(Debug)]
pub struct Permit {
    pool: Weak<TokenCell>,
    valid: bool,
}

impl Permit {
    fn empty() -> Self {
        Self {
            pool: Weak::new(),
            valid: false,
        }
    }

    fn held(pool: &Arc<TokenCell>) -> Self {
        Self {
            pool: Arc::downgrade(pool),
            valid: true,
        }
    }

    /// Whether this permit holds a token.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Give the token back to the pool.
    ///
    /// Marks the permit invalid; the refund itself happens when the
    /// permit is dropped, and only through a still-live pool reference.
    pub fn release(mut self) {
        self.valid = false;
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        // Invalid-but-referenced is the released state. An empty permit
        // is also invalid, but its dangling Weak can never upgrade.
        if !self.valid {
            if let Some(pool) = self.pool.upgrade() {
                *pool.lock() += 1;
            }
        }
    }
}

/// A capacity-bounded token pool refilled lazily from elapsed time.
///
/// `fetch_token` never blocks: either a token is available now and a
/// valid [`Permit`] is returned, or the caller gets an empty permit and
/// the request is rejected immediately.
///
/// Single-threaded by construction: fetching takes `&mut self`.
pub struct TokenBucketLimiter {
    rate: Rate,
    capacity: u64,
    tokens: Arc<TokenCell>,
    last_refill: Instant,
}

impl TokenBucketLimiter {
    /// Create a bucket whose burst capacity equals the per-second rate.
    pub fn new(rate: Rate) -> Self {
        let capacity = rate.count_per_second();
        Self::with_capacity(rate, capacity)
    }

    /// Create a bucket with an explicit burst capacity, starting full.
    pub fn with_capacity(rate: Rate, capacity: u64) -> Self {
        Self {
            rate,
            capacity,
            tokens: Arc::new(Mutex::new(capacity)),
            last_refill: Instant::now(),
        }
    }

    /// Take one token from the pool, refilling it first.
    pub fn fetch_token(&mut self) -> Permit {
        self.refill();

        let mut tokens = self.tokens.lock();
        if *tokens > 0 {
            *tokens -= 1;
            drop(tokens);
            Permit::held(&self.tokens)
        } else {
            Permit::empty()
        }
    }

    /// Tokens currently available.
    pub fn available(&self) -> u64 {
        *self.tokens.lock()
    }

    /// Credit tokens for whole seconds elapsed since the last refill.
    ///
    /// Sub-second remainders are dropped when the refill clock resets,
    /// matching the whole-second accounting of the fill formula.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed_secs = now.duration_since(self.last_refill).as_secs();
        if elapsed_secs > 0 {
            self.last_refill = now;

            let mut tokens = self.tokens.lock();
            *tokens = self
                .capacity
                .min(*tokens + self.rate.count_per_second() * elapsed_secs);
        }
    }
}

/// A logger gated by a [`TokenBucketLimiter`].
///
/// On a failed write the fetched permit is released, so a failed
/// emission does not permanently cost quota.
pub struct TokenBucketLogger<S: Sink = ConsoleSink> {
    limiter: TokenBucketLimiter,
    sink: S,
}

impl TokenBucketLogger {
    /// Create a logger emitting to the console.
    pub fn new(logs_per_second: u64) -> Self {
        Self::with_sink(Rate::per_second(logs_per_second), ConsoleSink)
    }
}

impl<S: Sink> TokenBucketLogger<S> {
    /// Create a logger emitting to a custom sink.
    pub fn with_sink(rate: Rate, sink: S) -> Self {
        Self {
            limiter: TokenBucketLimiter::new(rate),
            sink,
        }
    }

    /// Create a logger with an explicit burst capacity.
    pub fn with_capacity(rate: Rate, capacity: u64, sink: S) -> Self {
        Self {
            limiter: TokenBucketLimiter::with_capacity(rate, capacity),
            sink,
        }
    }
}

#[async_trait]
impl<S: Sink + Send> Limiter for TokenBucketLogger<S> {
    fn log(&mut self, level: Level, message: &str) {
        let permit = self.limiter.fetch_token();
        if permit.is_valid() {
            if !self.sink.log(level, message) {
                permit.release();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSink {
        written: AtomicUsize,
        succeed: bool,
    }

    impl CountingSink {
        fn new(succeed: bool) -> Self {
            Self {
                written: AtomicUsize::new(0),
                succeed,
            }
        }
    }

    impl Sink for &CountingSink {
        fn log(&self, _level: Level, _message: &str) -> bool {
            self.written.fetch_add(1, Ordering::SeqCst);
            self.succeed
        }
    }

    #[test]
    fn test_full_bucket_yields_exactly_capacity_tokens() {
        let mut limiter = TokenBucketLimiter::with_capacity(Rate::per_second(100), 5);

        let permits: Vec<Permit> = (0..5).map(|_| limiter.fetch_token()).collect();
        assert!(permits.iter().all(Permit::is_valid));
        assert_eq!(limiter.available(), 0);

        // Sixth fetch with no time elapsed comes back empty.
        assert!(!limiter.fetch_token().is_valid());
    }

    #[test]
    fn test_release_refunds_the_token() {
        let mut limiter = TokenBucketLimiter::with_capacity(Rate::per_second(100), 1);

        let permit = limiter.fetch_token();
        assert!(permit.is_valid());
        assert_eq!(limiter.available(), 0);

        permit.release();
        assert_eq!(limiter.available(), 1);

        // The refunded token is immediately fetchable again.
        assert!(limiter.fetch_token().is_valid());
    }

    #[test]
    fn test_fetch_then_release_round_trips_the_count() {
        let mut limiter = TokenBucketLimiter::with_capacity(Rate::per_second(100), 7);
        let before = limiter.available();

        limiter.fetch_token().release();

        assert_eq!(limiter.available(), before);
    }

    #[test]
    fn test_consumed_permit_does_not_refund_on_drop() {
        let mut limiter = TokenBucketLimiter::with_capacity(Rate::per_second(100), 3);

        {
            let _permit = limiter.fetch_token();
        }
        assert_eq!(limiter.available(), 2);
    }

    #[test]
    fn test_empty_permit_never_refunds() {
        let mut limiter = TokenBucketLimiter::with_capacity(Rate::per_second(100), 1);

        let held = limiter.fetch_token();
        let empty = limiter.fetch_token();
        assert!(!empty.is_valid());

        drop(empty);
        assert_eq!(limiter.available(), 0);

        drop(held);
        assert_eq!(limiter.available(), 0);
    }

    #[test]
    fn test_release_after_limiter_dropped_is_a_no_op() {
        let mut limiter = TokenBucketLimiter::with_capacity(Rate::per_second(100), 1);
        let permit = limiter.fetch_token();

        drop(limiter);
        permit.release();
    }

    #[test]
    fn test_refill_after_one_second_caps_at_capacity() {
        let mut limiter = TokenBucketLimiter::with_capacity(Rate::per_second(5), 3);

        for _ in 0..3 {
            assert!(limiter.fetch_token().is_valid());
        }
        assert!(!limiter.fetch_token().is_valid());

        std::thread::sleep(Duration::from_millis(1050));

        // One whole second elapsed credits five tokens, but the pool
        // tops out at its burst capacity of three.
        assert!(limiter.fetch_token().is_valid());
        assert_eq!(limiter.available(), 2);
    }

    #[test]
    fn test_logger_consumes_one_token_per_admission() {
        let sink = CountingSink::new(true);
        let mut logger = TokenBucketLogger::with_capacity(Rate::per_second(100), 3, &sink);

        for i in 0..5 {
            logger.info(&format!("message {}", i));
        }

        assert_eq!(sink.written.load(Ordering::SeqCst), 3);
        assert_eq!(logger.limiter.available(), 0);
    }

    #[test]
    fn test_logger_refunds_on_failed_write() {
        let sink = CountingSink::new(false);
        let mut logger = TokenBucketLogger::with_capacity(Rate::per_second(100), 2, &sink);

        for _ in 0..4 {
            logger.error("write fails");
        }

        // Every attempt reached the sink because each failure refunded
        // its token.
        assert_eq!(sink.written.load(Ordering::SeqCst), 4);
        assert_eq!(logger.limiter.available(), 2);
    }
}
