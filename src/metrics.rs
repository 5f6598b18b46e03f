// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for index-sync.
//!
//! Uses the `metrics` crate for backend-agnostic collection; the embedding
//! daemon chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `index_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Record an admission decision.
pub fn record_admission(allowed: bool) {
    let outcome = if allowed { "allowed" } else { "rejected" };
    counter!(
        "index_sync_admissions_total",
        "outcome" => outcome
    )
    .increment(1);
}

/// Set the number of client buckets currently tracked.
pub fn set_tracked_clients(count: usize) {
    gauge!("index_sync_tracked_clients").set(count as f64);
}

/// Record buckets removed by an idle sweep.
pub fn record_swept_buckets(count: usize) {
    counter!("index_sync_swept_buckets_total").increment(count as u64);
}

/// Record a reconciliation outcome (success, gave_up, cancelled).
pub fn record_reconciliation(kind: &str, status: &str) {
    counter!(
        "index_sync_reconciliations_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record end-to-end reconciliation latency, backoff waits included.
pub fn record_reconciliation_latency(kind: &str, duration: Duration) {
    histogram!(
        "index_sync_reconciliation_seconds",
        "kind" => kind.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record how many attempts a retried operation took before terminating.
pub fn record_retry_attempts(operation: &str, attempts: usize) {
    histogram!(
        "index_sync_retry_attempts",
        "operation" => operation.to_string()
    )
    .record(attempts as f64);
}
