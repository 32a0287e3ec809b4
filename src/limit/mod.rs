//! Admission strategies that gate message emission.

mod leaky_bucket;
mod rate;
mod sliding_log;
mod sliding_window;
mod token_bucket;

pub use leaky_bucket::LeakyBucketLogger;
pub use rate::Rate;
pub use sliding_log::SlidingLogLogger;
pub use sliding_window::SlidingWindowCounterLogger;
pub use token_bucket::{Permit, TokenBucketLimiter, TokenBucketLogger};

use async_trait::async_trait;

use crate::config::{RatelogConfig, Strategy};
use crate::error::Result;
use crate::sink::{ConsoleSink, Level};

/// Common surface shared by every limiter strategy.
///
/// A limiter decides whether a message is emitted now and updates its
/// internal state accordingly. Rejection is silent: rate limiting means
/// dropping, and a dropped message is policy, not an error.
#[async_trait]
pub trait Limiter: Send {
    /// Submit a message at the given level.
    fn log(&mut self, level: Level, message: &str);

    /// Submit an informational message.
    fn info(&mut self, message: &str) {
        self.log(Level::Info, message);
    }

    /// Submit an error message.
    fn error(&mut self, message: &str) {
        self.log(Level::Error, message);
    }

    /// Stop any background work. The default is a no-op; only the leaky
    /// bucket has a worker to wind down.
    async fn shutdown(&mut self) {}
}

/// Build the configured strategy behind the common [`Limiter`] surface.
///
/// Validates the configuration first, so a zero rate surfaces as a
/// `Config` error here rather than a panic inside a limiter. The leaky
/// bucket's worker is started as part of construction, which therefore
/// must happen within a Tokio runtime for that strategy.
pub fn from_config(config: &RatelogConfig) -> Result<Box<dyn Limiter>> {
    config.validate()?;

    let rate = Rate::per_second(config.logs_per_second);
    Ok(match config.strategy {
        Strategy::LeakyBucket => {
            let mut logger = LeakyBucketLogger::with_sink(rate, ConsoleSink);
            logger.start();
            Box::new(logger)
        }
        Strategy::SlidingLog => Box::new(SlidingLogLogger::with_sink(rate, ConsoleSink)),
        Strategy::SlidingWindowCounter => {
            Box::new(SlidingWindowCounterLogger::with_sink(rate, ConsoleSink))
        }
        Strategy::TokenBucket => match config.burst_capacity {
            Some(capacity) => Box::new(TokenBucketLogger::with_capacity(
                rate,
                capacity,
                ConsoleSink,
            )),
            None => Box::new(TokenBucketLogger::with_sink(rate, ConsoleSink)),
        },
    })
}
