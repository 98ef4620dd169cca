//! Wait Mechanisms
//!
//! Explicit bounded polling. Every wait in the harness goes through
//! [`poll_until`]: the check runs immediately, then again after a delay that
//! grows geometrically up to a cap, until it reports ready or the fixed
//! timeout elapses. A timeout is returned as a typed [`Stall`] carrying the
//! last observed state; it never blocks indefinitely.

use crate::result::HarnessResult;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default first polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default ceiling for the polling interval (500ms)
pub const DEFAULT_MAX_POLL_INTERVAL_MS: u64 = 500;

/// Default backoff multiplier
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

// =============================================================================
// POLL POLICY
// =============================================================================

/// Timeout and backoff for a polling wait
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Total time budget in milliseconds
    pub timeout_ms: u64,
    /// First delay between checks in milliseconds
    pub interval_ms: u64,
    /// Upper bound for the delay in milliseconds
    pub max_interval_ms: u64,
    /// Multiplier applied to the delay after every failed check
    pub backoff: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_interval_ms: DEFAULT_MAX_POLL_INTERVAL_MS,
            backoff: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl PollPolicy {
    /// Create a policy with the given timeout and default backoff
    #[must_use]
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            ..Self::default()
        }
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set first polling interval in milliseconds
    #[must_use]
    pub const fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Set the polling interval ceiling in milliseconds
    #[must_use]
    pub const fn with_max_interval(mut self, max_interval_ms: u64) -> Self {
        self.max_interval_ms = max_interval_ms;
        self
    }

    /// Set the backoff multiplier (values below 1.0 are treated as 1.0)
    #[must_use]
    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    /// Timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay to use before attempt `attempt + 1` (zero-based)
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff.max(1.0).powi(attempt.min(32) as i32);
        let cap = self.max_interval_ms.max(self.interval_ms) as f64;
        let ms = (self.interval_ms as f64 * factor).min(cap);
        Duration::from_millis(ms as u64)
    }
}

// =============================================================================
// CHECK / STALL
// =============================================================================

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<T> {
    /// Condition holds; polling stops with this value
    Ready(T),
    /// Condition does not hold yet; the string describes what was observed
    NotYet(String),
}

/// A wait that ran out of time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stall {
    /// Number of checks performed
    pub attempts: u32,
    /// Time spent waiting
    pub elapsed: Duration,
    /// What the last check observed
    pub last_observed: String,
}

impl Stall {
    /// Elapsed milliseconds, saturating
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Run `check` until it is ready or the policy's timeout elapses.
///
/// The check always runs at least once. Errors from the check abort the wait
/// immediately; they are not retried. The final sleep is clipped so the wait
/// never overshoots the deadline by more than one check.
pub async fn poll_until<T, F, Fut>(
    policy: &PollPolicy,
    mut check: F,
) -> HarnessResult<Result<T, Stall>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<Check<T>>>,
{
    let start = Instant::now();
    let deadline = start + policy.timeout();
    let mut attempts: u32 = 0;

    loop {
        let observed = match check().await? {
            Check::Ready(value) => return Ok(Ok(value)),
            Check::NotYet(observed) => observed,
        };
        attempts += 1;

        let now = Instant::now();
        if now >= deadline {
            return Ok(Err(Stall {
                attempts,
                elapsed: now - start,
                last_observed: observed,
            }));
        }

        let delay = policy.delay_after(attempts - 1).min(deadline - now);
        tokio::time::sleep(delay).await;
    }
}

// =============================================================================
// TESTS
// =============================================================================
