//! Ratelog - Rate-Limited Logging
//!
//! This crate gates a logger's throughput behind one of four admission
//! strategies: a leaky bucket drained by a background worker, an exact
//! sliding log, an approximate sliding-window counter, and a token
//! bucket with refundable permits. All strategies share the `Limiter`
//! surface and emit admitted messages through a `Sink`.

pub mod config;
pub mod error;
pub mod limit;
pub mod sink;
