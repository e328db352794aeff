//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, SecondsFormat, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get current Unix timestamp in UTC (milliseconds)
    fn now_millis(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        get_utc_timestamp()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: i64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: fixed_time_millis,
        }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.fixed_time
    }
}

/// Wall-clock anchor advanced by the tokio clock.
///
/// Under `tokio::time::pause()` the reported time only moves when the runtime
/// clock is advanced, which keeps hold expiries and timers on the same axis.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor_millis: i64,
    origin: tokio::time::Instant,
}

impl MonotonicClock {
    /// Anchor at the current system time
    pub fn new() -> Self {
        Self::starting_at(get_utc_timestamp())
    }

    /// Anchor at an explicit wall-clock time (milliseconds)
    pub fn starting_at(anchor_millis: i64) -> Self {
        Self {
            anchor_millis,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> i64 {
        let elapsed = self.origin.elapsed().as_millis();
        self.anchor_millis + i64::try_from(elapsed).unwrap_or(i64::MAX - self.anchor_millis)
    }
}

/// Get current Unix timestamp in UTC (milliseconds)
pub fn get_utc_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert Unix timestamp (milliseconds) to UTC RFC 3339 format.
///
/// Returns `None` when the timestamp is out of chrono's range.
pub fn timestamp_to_rfc3339(timestamp_millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(timestamp_millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}
