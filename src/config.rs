//! Configuration for the index-sync engine.
//!
//! # Example
//!
//! ```
//! use index_sync::IndexSyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = IndexSyncConfig::default();
//! assert_eq!(config.admit_capacity, 60);
//!
//! // Partial config, rest defaulted
//! let config: IndexSyncConfig = serde_json::from_str(
//!     r#"{"admit_capacity": 10, "admit_window_ms": 1000}"#
//! ).unwrap();
//! assert_eq!(config.admit_capacity, 10);
//! assert_eq!(config.retry_multiplier, 1.5);
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::resilience::retry::RetryPolicy;

/// Static configuration, fixed at process start.
///
/// All fields have production defaults: 60 requests per client per minute,
/// idle buckets swept after ten windows, reconciliation retried for up to
/// ten seconds with exponential backoff.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexSyncConfig {
    /// Max requests per client within one window
    #[serde(default = "default_admit_capacity")]
    pub admit_capacity: u32,

    /// Fixed-window duration in milliseconds
    #[serde(default = "default_admit_window_ms")]
    pub admit_window_ms: u64,

    /// Buckets idle for this many windows are swept
    #[serde(default = "default_idle_window_multiple")]
    pub idle_window_multiple: u32,

    /// Interval between idle sweeps, in milliseconds
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Backoff before the first retry, in milliseconds
    #[serde(default = "default_retry_initial_ms")]
    pub retry_initial_ms: u64,

    /// Backoff growth factor between attempts
    #[serde(default = "default_retry_multiplier")]
    pub retry_multiplier: f64,

    /// Cap on a single backoff wait, in milliseconds
    #[serde(default = "default_retry_max_interval_ms")]
    pub retry_max_interval_ms: u64,

    /// Total retry budget per reconciliation, in milliseconds
    #[serde(default = "default_retry_max_elapsed_ms")]
    pub retry_max_elapsed_ms: u64,
}

fn default_admit_capacity() -> u32 { 60 }
fn default_admit_window_ms() -> u64 { 60_000 } // one minute
fn default_idle_window_multiple() -> u32 { 10 }
fn default_sweep_interval_ms() -> u64 { 120_000 } // two minutes
fn default_retry_initial_ms() -> u64 { 500 }
fn default_retry_multiplier() -> f64 { 1.5 }
fn default_retry_max_interval_ms() -> u64 { 60_000 }
fn default_retry_max_elapsed_ms() -> u64 { 10_000 }

impl Default for IndexSyncConfig {
    fn default() -> Self {
        Self {
            admit_capacity: default_admit_capacity(),
            admit_window_ms: default_admit_window_ms(),
            idle_window_multiple: default_idle_window_multiple(),
            sweep_interval_ms: default_sweep_interval_ms(),
            retry_initial_ms: default_retry_initial_ms(),
            retry_multiplier: default_retry_multiplier(),
            retry_max_interval_ms: default_retry_max_interval_ms(),
            retry_max_elapsed_ms: default_retry_max_elapsed_ms(),
        }
    }
}

impl IndexSyncConfig {
    /// Admission window as a [`Duration`].
    #[must_use]
    pub fn admit_window(&self) -> Duration {
        Duration::from_millis(self.admit_window_ms)
    }

    /// Idle threshold after which a client bucket is swept.
    #[must_use]
    pub fn idle_threshold(&self) -> Duration {
        Duration::from_millis(self.admit_window_ms * u64::from(self.idle_window_multiple))
    }

    /// Sweep interval as a [`Duration`].
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Retry policy shared by all reconciliation dispatches.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_interval: Duration::from_millis(self.retry_initial_ms),
            multiplier: self.retry_multiplier,
            max_interval: Duration::from_millis(self.retry_max_interval_ms),
            max_elapsed: Duration::from_millis(self.retry_max_elapsed_ms),
        }
    }
}
