//! Retry policy for Remote Store calls
//!
//! A [`RetryPolicy`] wraps one operation at a time. The caller supplies a
//! classifier that turns each error into a [`RetryDecision`]; the policy
//! owns the attempt budget and the backoff schedule. Rate-limit resets
//! reported by the store are honoured when they fit within
//! `max_rate_limit_wait`, otherwise the error is surfaced immediately.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use projsync_core::config::RetryConfig;
use projsync_core::ports::RemoteError;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Return the error to the caller
    Abort,
    /// Retry after the policy's backoff delay
    Retry,
    /// Retry after the given delay
    RetryAfter(Duration),
}

/// Exponential backoff: `base * 2^n`, capped at `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before retry number `retry` (0 for the first retry)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; zero behaves as one
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Longest store-requested wait the policy will sleep through
    pub max_rate_limit_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff, max_rate_limit_wait: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
            max_rate_limit_wait,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: Backoff::new(
                Duration::from_millis(config.base_delay_ms),
                Duration::from_millis(config.max_delay_ms),
            ),
            max_rate_limit_wait: Duration::from_secs(config.max_rate_limit_wait_secs),
        }
    }

    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self::new(1, Backoff::new(Duration::ZERO, Duration::ZERO), Duration::ZERO)
    }

    /// Runs `f` until it succeeds, the classifier aborts, or attempts run out
    ///
    /// The last error is returned unchanged when giving up.
    pub async fn execute<T, E, F, Fut, C>(&self, operation: &str, classify: C, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RetryDecision,
        E: Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if attempt >= attempts {
                        warn!(operation, attempt, error = %err, "Retry attempts exhausted");
                        return Err(err);
                    }

                    let delay = match classify(&err) {
                        RetryDecision::Abort => return Err(err),
                        RetryDecision::Retry => self.backoff.delay_for(attempt - 1),
                        RetryDecision::RetryAfter(delay) => delay,
                    };

                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Classifies a Remote Store error under this policy
    ///
    /// Permanent errors abort. Rate limits wait for the store's reset when it
    /// is known and no longer than `max_rate_limit_wait`; a longer reset
    /// aborts so the caller sees the reset time instead of sleeping.
    pub fn remote_decision(&self, err: &RemoteError) -> RetryDecision {
        if !err.is_transient() {
            return RetryDecision::Abort;
        }
        match err.retry_after() {
            Some(wait) if wait > self.max_rate_limit_wait => RetryDecision::Abort,
            Some(wait) => RetryDecision::RetryAfter(wait),
            None => RetryDecision::Retry,
        }
    }

    /// [`execute`](Self::execute) with [`remote_decision`](Self::remote_decision)
    pub async fn run_remote<T, F, Fut>(&self, operation: &str, f: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        self.execute(operation, |err| self.remote_decision(err), f).await
    }
}
