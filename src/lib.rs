//! # Index Sync
//!
//! Consistency propagation between a relational content catalog and a
//! denormalized search index, plus per-client admission control for the
//! request path in front of it.
//!
//! ## Architecture
//!
//! ```text
//!                       ┌─────────────────────────────────────────┐
//!  inbound request ───▶ │           AdmissionController           │
//!                       │  • fixed-window token bucket per client │
//!                       │  • lock-per-bucket, idle sweep          │
//!                       └────────────────────┬────────────────────┘
//!                                            │ admitted
//!                                            ▼
//!                       ┌─────────────────────────────────────────┐
//!                       │      mutation handler (external)        │
//!                       │  relational write, then dispatch and    │
//!                       │  respond without waiting                │
//!                       └────────────────────┬────────────────────┘
//!                                            │ ChangeSet
//!                                            ▼
//!                       ┌─────────────────────────────────────────┐
//!                       │               Reconciler                │
//!                       │  • detached task per dispatch           │
//!                       │  • tag membership resolved at execution │
//!                       │  • wrapped in bounded-backoff retry     │
//!                       └────────────────────┬────────────────────┘
//!                                            │ Documents
//!                                            ▼
//!                       ┌─────────────────────────────────────────┐
//!                       │          SearchIndex (external)         │
//!                       │  idempotent upsert, last write wins     │
//!                       └─────────────────────────────────────────┘
//! ```
//!
//! The relational write is durable on its own; the index converges after a
//! successful reconciliation. In between, search results may be stale: that
//! window is the price of keeping request latency decoupled from index-write
//! latency.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use index_sync::{Document, IndexSyncConfig, IndexSyncEngine};
//! use index_sync::store::memory::{InMemoryCatalog, InMemoryIndex};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = IndexSyncEngine::new(
//!         IndexSyncConfig::default(),
//!         Arc::new(InMemoryCatalog::new()),
//!         Arc::new(InMemoryIndex::new()),
//!     );
//!     engine.start();
//!
//!     // Per-request gate, ahead of any handler logic
//!     if !engine.admit("203.0.113.7") {
//!         // respond 429 and stop
//!     }
//!
//!     // After a successful relational mutation, fire and forget
//!     engine.reconciler().dispatch_tag_changed(42);
//!
//!     engine.shutdown().await;
//! }
//! ```
//!
//! ## Guarantees (and non-guarantees)
//!
//! - **At-least-once, not exactly-once**: a reconciliation may run more than
//!   once; index writes are idempotent by document id.
//! - **No cross-store transaction**: an exhausted retry budget leaves the
//!   index stale until a future mutation re-triggers reconciliation.
//! - **Unordered**: overlapping reconciliations race; the last index write
//!   wins.
//! - **Limiter state is ephemeral**: a restart forgets all client budgets.
//!
//! ## Modules
//!
//! - [`engine`]: the [`IndexSyncEngine`] owning both subsystems
//! - [`admission`]: fixed-window per-client request gate
//! - [`reconcile`]: change dispatch and index reconciliation
//! - [`resilience`]: bounded-exponential-backoff retry executor
//! - [`store`]: capability traits for the two external stores
//! - [`config`]: process-start configuration
//! - [`metrics`]: counters and histograms for the above

pub mod admission;
pub mod config;
pub mod document;
pub mod engine;
pub mod metrics;
pub mod reconcile;
pub mod resilience;
pub mod store;

pub use admission::AdmissionController;
pub use config::IndexSyncConfig;
pub use document::{ArticleRecord, ChangeSet, Document};
pub use engine::{EngineState, IndexSyncEngine};
pub use reconcile::Reconciler;
pub use resilience::retry::{self, RetryError, RetryPolicy};
pub use store::traits::{RelationalStore, SearchIndex, StoreError};
