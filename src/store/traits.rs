use async_trait::async_trait;
use thiserror::Error;

use crate::document::{ArticleRecord, Document};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("tag {0} not found")]
    TagNotFound(i64),
    #[error("relational store error: {0}")]
    Relational(String),
    #[error("search index error: {0}")]
    Index(String),
}

/// Read access to the relational system of record.
///
/// Only the single query the reconciler needs is modeled here; repository
/// mechanics (SQL, pooling, schema) live with the embedding service.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Current full set of articles associated with a tag, with author name
    /// and tag labels already joined in.
    async fn find_articles_by_tag(&self, tag_id: i64) -> Result<Vec<ArticleRecord>, StoreError>;
}

/// Write access to the search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Upsert a batch of document projections in one call.
    ///
    /// Must be idempotent by document id: indexing the same id twice leaves
    /// the last projection visible.
    async fn index_documents(&self, documents: &[Document]) -> Result<(), StoreError>;
}
