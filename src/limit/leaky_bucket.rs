//! Leaky-bucket limiter drained by a background worker.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::sink::{ConsoleSink, Level, Sink};

use super::{Limiter, Rate};

/// A limiter that queues messages and drains them at a fixed cadence.
///
/// Producers enqueue without blocking into a bounded queue whose
/// capacity equals the configured per-second rate; once full, new
/// messages are dropped (drop-newest). A dedicated worker task emits one
/// message per elapsed interval, so bursts are absorbed up to capacity
/// and output never exceeds the configured pace.
///
/// The worker is spawned explicitly with [`start`](Self::start) and
/// stopped cooperatively with [`shutdown`](Limiter::shutdown); whatever
/// is still queued at that point is discarded. Dropping the logger
/// without a shutdown closes both channels, which the worker observes
/// and exits on its own.
pub struct LeakyBucketLogger<S: Sink + Send + 'static = ConsoleSink> {
    tx: mpsc::Sender<(Level, String)>,
    stop: watch::Sender<bool>,
    worker: Option<DrainWorker<S>>,
    handle: Option<JoinHandle<()>>,
}

/// The drain side of the queue, moved into the worker task on start.
struct DrainWorker<S> {
    rx: mpsc::Receiver<(Level, String)>,
    stop: watch::Receiver<bool>,
    sink: S,
    interval: Duration,
}

impl LeakyBucketLogger {
    /// Create a logger emitting to the console.
    pub fn new(logs_per_second: u64) -> Self {
        Self::with_sink(Rate::per_second(logs_per_second), ConsoleSink)
    }
}

impl<S: Sink + Send + 'static> LeakyBucketLogger<S> {
    /// Create a logger emitting to a custom sink.
    ///
    /// Panics on a zero rate, which has no drain interval.
    pub fn with_sink(rate: Rate, sink: S) -> Self {
        let interval = rate.interval();
        let capacity = rate.count_per_second() as usize;

        let (tx, rx) = mpsc::channel(capacity);
        let (stop, stop_rx) = watch::channel(false);

        Self {
            tx,
            stop,
            worker: Some(DrainWorker {
                rx,
                stop: stop_rx,
                sink,
                interval,
            }),
            handle: None,
        }
    }

    /// Spawn the drain worker. Must be called from within a Tokio
    /// runtime. Calling it again once the worker is running has no
    /// effect.
    pub fn start(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.handle = Some(tokio::spawn(worker.run()));
        }
    }

    /// Messages currently waiting to be drained.
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

impl<S: Sink + Send> DrainWorker<S> {
    async fn run(mut self) {
        debug!("drain worker started");

        let mut last_drain = Instant::now();
        loop {
            let entry = tokio::select! {
                _ = self.stop.changed() => break,
                entry = self.rx.recv() => entry,
            };
            let Some((level, message)) = entry else { break };

            // Hold emission until a full interval has passed since the
            // last successful drain. Pacing follows the wall clock, not
            // the queue depth.
            tokio::select! {
                _ = self.stop.changed() => break,
                _ = tokio::time::sleep_until(last_drain + self.interval) => {}
            }

            // A failed write loses the message without advancing the
            // drain clock, so the next entry is not penalized.
            if self.sink.log(level, &message) {
                last_drain = Instant::now();
            }
        }

        debug!("drain worker stopped");
    }
}

#[async_trait]
impl<S: Sink + Send + 'static> Limiter for LeakyBucketLogger<S> {
    fn log(&mut self, level: Level, message: &str) {
        // Full queue and stopped worker look the same from here: the
        // message is dropped without reporting an error.
        if self.tx.try_send((level, message.to_owned())).is_err() {
            trace!("queue full, dropping message");
        }
    }

    async fn shutdown(&mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
