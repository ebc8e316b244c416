//! Fixed-rate tick scheduling
//!
//! The match loop asks a [`Ticker`] whether a tick is due against a
//! [`Clock`]. Production uses the monotonic clock; tests drive a
//! [`VirtualClock`] by hand and never sleep.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest sleep between polls
pub const MAX_IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Ticks the loop may fall behind before it gives up catching up
pub const DEFAULT_MAX_LAG_TICKS: u32 = 5;

/// Monotonic time since an arbitrary origin
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock shared between a test and the code under test
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    nanos: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::AcqRel);
    }

    pub fn set(&self, to: Duration) {
        self.nanos.store(to.as_nanos() as u64, Ordering::Release);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}

/// Outcome of polling the ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPoll {
    /// Run one tick now
    Due,
    /// Nothing due; wait this long at most
    Wait(Duration),
}

/// Tracks when the next tick is due
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next_due: Duration,
    max_lag: Duration,
    resyncs: u64,
}

impl Ticker {
    pub fn new(interval: Duration, start: Duration) -> Self {
        Self::with_max_lag(interval, start, DEFAULT_MAX_LAG_TICKS)
    }

    pub fn with_max_lag(interval: Duration, start: Duration, max_lag_ticks: u32) -> Self {
        Self {
            interval,
            next_due: start,
            max_lag: interval * max_lag_ticks,
            resyncs: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Times the ticker dropped its backlog
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }

    /// Check for a due tick at `now`. Each `Due` consumes one interval. A
    /// backlog beyond the lag limit is dropped rather than replayed.
    pub fn poll(&mut self, now: Duration) -> TickPoll {
        if now < self.next_due {
            return TickPoll::Wait((self.next_due - now).min(MAX_IDLE_SLEEP));
        }

        if now - self.next_due > self.max_lag {
            self.next_due = now;
            self.resyncs += 1;
        }
        self.next_due += self.interval;
        TickPoll::Due
    }
}
