// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-client admission control.
//!
//! A fixed-window request gate: each client key gets a bucket of `capacity`
//! tokens that resets to full once per window. Unlike a leaky bucket there is
//! no continuous refill, so a client can burst its full quota at a window
//! boundary.
//!
//! The registry is a [`DashMap`] whose shard locks are held only for lookup
//! and lazy insertion; refill and decrement happen under each bucket's own
//! mutex, so unrelated clients never serialize on a shared lock.
//!
//! # Example
//!
//! ```
//! use index_sync::AdmissionController;
//! use std::time::Duration;
//!
//! let gate = AdmissionController::new(2, Duration::from_secs(1), Duration::from_secs(10));
//!
//! assert!(gate.admit("10.0.0.1"));
//! assert!(gate.admit("10.0.0.1"));
//! assert!(!gate.admit("10.0.0.1")); // quota spent for this window
//! assert!(gate.admit("10.0.0.2")); // other clients unaffected
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Token state for one client key.
///
/// `tokens` stays within `[0, capacity]`: it is only ever reset to capacity
/// or decremented when positive.
struct ClientBucket {
    tokens: u32,
    last_refill: Instant,
}

impl ClientBucket {
    fn full(capacity: u32) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }
}

/// Fixed-window request gate, one token bucket per observed client key.
///
/// Purely in-memory; a restart forgets all counters. `admit` is synchronous
/// and lock-bounded so it can sit inline on the request path.
pub struct AdmissionController {
    buckets: DashMap<String, Mutex<ClientBucket>>,
    capacity: u32,
    window: Duration,
    idle_threshold: Duration,
}

impl AdmissionController {
    #[must_use]
    pub fn new(capacity: u32, window: Duration, idle_threshold: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity,
            window,
            idle_threshold,
        }
    }

    /// Decide whether to accept a request from `client_key`.
    ///
    /// A brand-new client is admitted immediately at full capacity. Never an
    /// error: `false` means the caller should reject with a too-many-requests
    /// signal.
    pub fn admit(&self, client_key: &str) -> bool {
        let allowed = match self.buckets.get(client_key) {
            Some(bucket) => self.take_token(&mut bucket.lock()),
            None => {
                // Lazy insert; entry() re-checks under the shard write lock so
                // two first requests from the same key share one bucket.
                let bucket = self
                    .buckets
                    .entry(client_key.to_owned())
                    .or_insert_with(|| Mutex::new(ClientBucket::full(self.capacity)));
                let allowed = self.take_token(&mut bucket.lock());
                allowed
            }
        };

        if !allowed {
            debug!(client = client_key, "request rejected, window quota spent");
        }
        crate::metrics::record_admission(allowed);
        allowed
    }

    fn take_token(&self, bucket: &mut ClientBucket) -> bool {
        let now = Instant::now();
        if now.duration_since(bucket.last_refill) >= self.window {
            bucket.tokens = self.capacity;
            bucket.last_refill = now;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Remove buckets whose last refill is older than the idle threshold.
    ///
    /// Returns the number of buckets removed. The bucket lock is taken for
    /// each candidate, so a sweep never races an in-flight `admit` on the
    /// same bucket.
    pub fn sweep_idle(&self) -> usize {
        let before = self.buckets.len();
        let now = Instant::now();

        self.buckets.retain(|_, bucket| {
            let bucket = bucket.lock();
            now.duration_since(bucket.last_refill) <= self.idle_threshold
        });

        let removed = before - self.buckets.len();
        crate::metrics::set_tracked_clients(self.buckets.len());
        if removed > 0 {
            crate::metrics::record_swept_buckets(removed);
        }
        removed
    }

    /// Number of client keys currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    /// Spawn the periodic idle sweep on its own task.
    ///
    /// Runs until the token is cancelled; the returned handle is joined by
    /// the engine on shutdown.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let controller = self;
        // tokio::time::interval panics on a zero period
        let period = interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("admission sweeper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = controller.sweep_idle();
                        if removed > 0 {
                            debug!(removed, tracked = controller.tracked_clients(), "swept idle client buckets");
                        }
                    }
                }
            }
        })
    }
}
