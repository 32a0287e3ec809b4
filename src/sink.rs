//! Message emission.
//!
//! Limiters decide *whether* a message goes out; the [`Sink`] is where
//! admitted messages actually go. The trait carries a success flag so a
//! limiter can react to a failed write (the token bucket refunds its
//! token, for example).

use std::io::Write;

use chrono::Utc;

/// Severity of an emitted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    /// Single-character code used in the output prefix.
    pub fn code(&self) -> char {
        match self {
            Level::Debug => 'D',
            Level::Info => 'I',
            Level::Warning => 'W',
            Level::Error => 'E',
            Level::Critical => 'C',
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Terminal consumer of admitted messages.
pub trait Sink {
    /// Write one message. Returns `false` if the write failed.
    fn log(&self, level: Level, message: &str) -> bool;
}

/// Sink that writes timestamped lines to stdout.
///
/// Output format: `[2021-03-11 12:00:00 UTC](I) message`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn log(&self, level: Level, message: &str) -> bool {
        let now = Utc::now();
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "[{}]({}) {}", now.format("%F %T %Z"), level, message).is_ok()
    }
}
