// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Change dispatch and search-index reconciliation.
//!
//! After a successful relational mutation the handler calls one of the
//! `dispatch_*` methods and moves on; the reconciliation runs on a detached
//! task wrapped in the retry executor. At-least-once, fire-and-forget: the
//! originating request never observes the outcome, which is surfaced only
//! through logs and counters.
//!
//! Two propagation paths:
//! - **Articles changed**: the handler already resolved author names and tag
//!   labels, so the supplied documents are pushed to the index as-is.
//! - **Tag changed**: membership is re-resolved against the relational store
//!   when the task runs. A tag event dispatched before an association update
//!   still indexes the post-update membership.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::document::{ChangeSet, Document};
use crate::resilience::retry::{self, RetryError, RetryPolicy};
use crate::store::traits::{RelationalStore, SearchIndex, StoreError};

/// Dispatches change events and owns the reconciliation tasks they spawn.
///
/// Cheap to share: holds `Arc`s to the two store capabilities plus the retry
/// policy and the engine's shutdown token.
pub struct Reconciler {
    relational: Arc<dyn RelationalStore>,
    index: Arc<dyn SearchIndex>,
    policy: RetryPolicy,
    shutdown: CancellationToken,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        index: Arc<dyn SearchIndex>,
        policy: RetryPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            relational,
            index,
            policy,
            shutdown,
        }
    }

    /// Propagate an article mutation to the search index.
    ///
    /// Returns immediately; the caller-supplied documents are the source of
    /// truth and go to the index without a re-fetch. The returned handle is a
    /// completion signal for test harnesses; production call sites drop it.
    pub fn dispatch_articles_changed(&self, documents: Vec<Document>) -> JoinHandle<()> {
        self.dispatch(ChangeSet::ArticlesChanged(documents))
    }

    /// Propagate a tag mutation (rename, merge) to the search index.
    ///
    /// Returns immediately. Membership is resolved when the task executes,
    /// never cached at dispatch time, so the indexed set reflects the
    /// associations current at execution.
    pub fn dispatch_tag_changed(&self, tag_id: i64) -> JoinHandle<()> {
        self.dispatch(ChangeSet::TagChanged(tag_id))
    }

    fn dispatch(&self, change: ChangeSet) -> JoinHandle<()> {
        let relational = Arc::clone(&self.relational);
        let index = Arc::clone(&self.index);
        let policy = self.policy.clone();
        let cancel = self.shutdown.clone();

        tokio::spawn(async move {
            let kind = change.kind();
            let started = Instant::now();

            let outcome = retry::execute(kind, &policy, &cancel, || {
                let change = change.clone();
                let relational = Arc::clone(&relational);
                let index = Arc::clone(&index);
                async move { reconcile(&change, relational.as_ref(), index.as_ref()).await }
            })
            .await;

            match outcome {
                Ok(indexed) => {
                    debug!(kind, indexed, "reconciliation complete");
                    crate::metrics::record_reconciliation(kind, "success");
                    crate::metrics::record_reconciliation_latency(kind, started.elapsed());
                }
                Err(RetryError::Cancelled) => {
                    debug!(kind, "reconciliation cancelled by shutdown");
                    crate::metrics::record_reconciliation(kind, "cancelled");
                }
                Err(RetryError::Exhausted { attempts, error }) => {
                    // Swallowed here: the index stays stale for this entity
                    // until a future mutation re-triggers reconciliation.
                    error!(
                        kind,
                        attempts,
                        error = %error,
                        "reconciliation abandoned, index left stale"
                    );
                    crate::metrics::record_reconciliation(kind, "gave_up");
                }
            }
        })
    }
}

/// One reconciliation attempt: resolve state if needed, write the index.
///
/// The whole attempt is the retry unit; a failure in either step fails the
/// attempt and the next attempt redoes both. Returns the number of documents
/// written.
async fn reconcile(
    change: &ChangeSet,
    relational: &dyn RelationalStore,
    index: &dyn SearchIndex,
) -> Result<usize, StoreError> {
    match change {
        ChangeSet::ArticlesChanged(documents) => {
            index.index_documents(documents).await?;
            Ok(documents.len())
        }
        ChangeSet::TagChanged(tag_id) => {
            let records = relational.find_articles_by_tag(*tag_id).await?;
            let documents: Vec<Document> = records.into_iter().map(Document::from).collect();
            index.index_documents(&documents).await?;
            Ok(documents.len())
        }
    }
}
