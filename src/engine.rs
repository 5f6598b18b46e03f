//! Engine lifecycle: wiring, start, shutdown.
//!
//! The [`IndexSyncEngine`] is the process-wide owner of the two subsystems.
//! It exists so that nothing in this crate is a global: the client registry
//! and the reconciliation plumbing are created at startup, handed out as
//! borrows, and torn down together.
//!
//! # Lifecycle
//!
//! ```text
//! Created → Running → ShuttingDown → Stopped
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use index_sync::{IndexSyncConfig, IndexSyncEngine};
//! use index_sync::store::memory::{InMemoryCatalog, InMemoryIndex};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let engine = IndexSyncEngine::new(
//!     IndexSyncConfig::default(),
//!     Arc::new(InMemoryCatalog::new()),
//!     Arc::new(InMemoryIndex::new()),
//! );
//! engine.start();
//!
//! // request path
//! if engine.admit("203.0.113.7") {
//!     // ... run handler, then after a relational write:
//!     engine.reconciler().dispatch_tag_changed(42);
//! }
//!
//! engine.shutdown().await;
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::admission::AdmissionController;
use crate::config::IndexSyncConfig;
use crate::reconcile::Reconciler;
use crate::store::traits::{RelationalStore, SearchIndex};

/// Engine lifecycle state, broadcast to watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Owner of the admission controller and reconciler.
///
/// Construction wires the subsystems; [`start`](Self::start) brings up the
/// background sweeper; [`shutdown`](Self::shutdown) cancels in-flight backoff
/// waits and joins the sweeper.
pub struct IndexSyncEngine {
    admission: Arc<AdmissionController>,
    reconciler: Reconciler,
    shutdown: CancellationToken,
    sweep_interval: Duration,
    state: watch::Sender<EngineState>,
    state_rx: watch::Receiver<EngineState>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl IndexSyncEngine {
    /// Wire the engine from config and the two store capabilities.
    #[must_use]
    pub fn new(
        config: IndexSyncConfig,
        relational: Arc<dyn RelationalStore>,
        index: Arc<dyn SearchIndex>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(EngineState::Created);

        let admission = Arc::new(AdmissionController::new(
            config.admit_capacity,
            config.admit_window(),
            config.idle_threshold(),
        ));

        let reconciler = Reconciler::new(
            relational,
            index,
            config.retry_policy(),
            shutdown.child_token(),
        );

        Self {
            admission,
            reconciler,
            shutdown,
            sweep_interval: config.sweep_interval(),
            state: state_tx,
            state_rx,
            sweeper: Mutex::new(None),
        }
    }

    /// Start background maintenance and transition to `Running`.
    ///
    /// Must be called from within a tokio runtime. Idempotent: a second call
    /// is a no-op.
    pub fn start(&self) {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            return;
        }

        *sweeper = Some(
            Arc::clone(&self.admission)
                .spawn_sweeper(self.sweep_interval, self.shutdown.child_token()),
        );
        let _ = self.state.send(EngineState::Running);
        info!(sweep_interval = ?self.sweep_interval, "index-sync engine running");
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        *self.state_rx.borrow()
    }

    /// Receiver to watch state transitions.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<EngineState> {
        self.state_rx.clone()
    }

    /// Gate an inbound request; `false` means reject with too-many-requests.
    pub fn admit(&self, client_key: &str) -> bool {
        self.admission.admit(client_key)
    }

    /// The admission controller, for callers that mount it as middleware.
    #[must_use]
    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    /// The reconciler, for mutation handlers.
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Graceful shutdown: cancel pending backoff waits, join the sweeper.
    ///
    /// Detached reconciliation tasks that are mid-attempt finish that attempt;
    /// tasks waiting in backoff observe the cancellation and stop.
    pub async fn shutdown(&self) {
        let _ = self.state.send(EngineState::ShuttingDown);
        info!("index-sync engine shutting down");
        self.shutdown.cancel();

        let sweeper = self.sweeper.lock().take();
        if let Some(handle) = sweeper {
            let _ = handle.await;
        }

        let _ = self.state.send(EngineState::Stopped);
        info!("index-sync engine stopped");
    }
}
