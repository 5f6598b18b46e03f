// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry with bounded exponential backoff.
//!
//! The executor knows nothing about what it retries: it takes any fallible
//! async operation, a [`RetryPolicy`], and a cancellation token, and drives
//! the operation until it succeeds, the elapsed-time budget runs out, or the
//! token fires.
//!
//! # Example
//!
//! ```
//! use index_sync::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.initial_interval, Duration::from_millis(500));
//!
//! // Waits grow by the multiplier and cap at max_interval
//! let next = policy.next_interval(Duration::from_secs(50));
//! assert_eq!(next, Duration::from_secs(60));
//! ```

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Backoff policy shared by all reconciliation dispatches.
///
/// A plain value object: interval, growth factor, interval cap, and a total
/// elapsed-time budget after which the executor gives up.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::reconcile()
    }
}

impl RetryPolicy {
    /// Production policy for index reconciliation: 500ms initial backoff,
    /// growing by 1.5x per attempt, capped at 60s per wait, giving up after
    /// a 10 second total budget.
    #[must_use]
    pub fn reconcile() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            multiplier: 1.5,
            max_interval: Duration::from_secs(60),
            max_elapsed: Duration::from_secs(10),
        }
    }

    /// Next backoff wait given the current one: multiplied, then capped.
    #[must_use]
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier).min(self.max_interval)
    }

    /// Fast policy for tests (minimal delays)
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            initial_interval: Duration::from_millis(1),
            multiplier: 2.0,
            max_interval: Duration::from_millis(10),
            max_elapsed: Duration::from_millis(250),
        }
    }
}

/// Terminal outcome of an exhausted or cancelled retry loop.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The elapsed-time budget ran out; carries the last observed error.
    Exhausted { attempts: usize, error: E },
    /// The cancellation token fired before or between attempts.
    Cancelled,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, error } => {
                write!(f, "gave up after {} attempts: {}", attempts, error)
            }
            Self::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl<E: fmt::Display + fmt::Debug> std::error::Error for RetryError<E> {}

/// Drive `operation` until success, budget exhaustion, or cancellation.
///
/// The token is checked before each attempt and raced against each backoff
/// wait; a cancelled wait returns [`RetryError::Cancelled`] without starting
/// another attempt. Budget exhaustion returns the last error seen. Each
/// attempt runs to completion once started.
pub async fn execute<F, Fut, T, E>(
    operation_name: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let started = Instant::now();
    let mut interval = policy.initial_interval;
    let mut attempts = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        attempts += 1;
        match operation().await {
            Ok(val) => {
                if attempts > 1 {
                    info!(operation = operation_name, attempts, "succeeded after retries");
                }
                crate::metrics::record_retry_attempts(operation_name, attempts);
                return Ok(val);
            }
            Err(err) => {
                if started.elapsed() >= policy.max_elapsed {
                    warn!(
                        operation = operation_name,
                        attempts,
                        error = %err,
                        "retry budget exhausted, giving up"
                    );
                    crate::metrics::record_retry_attempts(operation_name, attempts);
                    return Err(RetryError::Exhausted { attempts, error: err });
                }

                warn!(
                    operation = operation_name,
                    attempts,
                    error = %err,
                    wait = ?interval,
                    "attempt failed, backing off"
                );

                tokio::select! {
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = sleep(interval) => {}
                }

                interval = policy.next_interval(interval);
            }
        }
    }
}
