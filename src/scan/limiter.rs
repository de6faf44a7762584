//! Global Rate Limiter
//!
//! Token bucket shared by every remote call of a run. Tokens are tracked as
//! a theoretical arrival time (GCRA), which behaves exactly like a token
//! bucket refilled at `rate` tokens per second with `burst` capacity, but
//! hands out start slots in FIFO order without a retry loop.
//!
//! With the default burst of 1 consecutive starts are at least `1/rate`
//! apart (rounded up to the next nanosecond), so no rolling second ever sees
//! more than `rate` calls begin.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

use crate::error::{Error, Result};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Process-wide throttle for remote operations.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between two starts at steady state
    interval: Duration,
    /// How far ahead of the steady-state schedule a caller may start
    burst_allowance: Duration,
    /// Theoretical arrival time of the next token
    tat: Mutex<Instant>,
    /// Tokens handed out
    taken: AtomicU64,
    /// Callers that had to wait for their token
    throttled: AtomicU64,
}

impl RateLimiter {
    /// Create a limiter allowing `ops_per_second` operations with no burst.
    pub fn new(ops_per_second: u32) -> Result<Self> {
        Self::with_burst(ops_per_second, 1)
    }

    /// Create a limiter with an explicit burst capacity.
    ///
    /// A burst above 1 lets up to `burst - 1` extra calls start in the first
    /// second after an idle period.
    pub fn with_burst(ops_per_second: u32, burst: u32) -> Result<Self> {
        if ops_per_second == 0 {
            return Err(Error::Config("rate limit must be at least 1 op/s".to_string()));
        }
        if burst == 0 {
            return Err(Error::Config("rate limiter burst must be at least 1".to_string()));
        }

        let interval_nanos = NANOS_PER_SEC.div_ceil(u64::from(ops_per_second));
        let interval = Duration::from_nanos(interval_nanos);

        Ok(Self {
            interval,
            burst_allowance: interval * (burst - 1),
            tat: Mutex::new(Instant::now()),
            taken: AtomicU64::new(0),
            throttled: AtomicU64::new(0),
        })
    }

    /// Wait until the caller may start one remote operation.
    pub async fn take(&self) {
        let start = self.reserve();
        self.taken.fetch_add(1, Ordering::Relaxed);

        if start > Instant::now() {
            self.throttled.fetch_add(1, Ordering::Relaxed);
            trace!(wait_ms = (start - Instant::now()).as_millis() as u64, "Rate limited");
            sleep_until(start).await;
        }
    }

    /// Reserve the next start slot and return when it begins.
    fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut tat = self.tat.lock();

        let start = match tat.checked_sub(self.burst_allowance) {
            Some(earliest) if earliest > now => earliest,
            _ => now,
        };
        *tat = (*tat).max(start) + self.interval;
        start
    }

    /// Minimum spacing between starts.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Total tokens handed out so far.
    pub fn taken(&self) -> u64 {
        self.taken.load(Ordering::Relaxed)
    }

    /// Number of callers that had to wait.
    pub fn throttled(&self) -> u64 {
        self.throttled.load(Ordering::Relaxed)
    }
}
