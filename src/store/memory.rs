use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::traits::{RelationalStore, SearchIndex, StoreError};
use crate::document::{ArticleRecord, Document};

/// In-memory relational catalog.
///
/// Holds article records plus the tag → article association table. Backs the
/// test suites; the query path mirrors what a SQL repository would return for
/// the tag membership join.
pub struct InMemoryCatalog {
    articles: DashMap<i64, ArticleRecord>,
    tag_members: DashMap<i64, Vec<i64>>,
    queries: AtomicUsize,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            articles: DashMap::new(),
            tag_members: DashMap::new(),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn insert_article(&self, record: ArticleRecord) {
        self.articles.insert(record.id, record);
    }

    /// Replace the member list for a tag (simulates association updates).
    pub fn set_tag_members(&self, tag_id: i64, article_ids: Vec<i64>) {
        self.tag_members.insert(tag_id, article_ids);
    }

    /// Number of membership queries served so far.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelationalStore for InMemoryCatalog {
    async fn find_articles_by_tag(&self, tag_id: i64) -> Result<Vec<ArticleRecord>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let member_ids = self
            .tag_members
            .get(&tag_id)
            .ok_or(StoreError::TagNotFound(tag_id))?
            .value()
            .clone();

        Ok(member_ids
            .iter()
            .filter_map(|id| self.articles.get(id).map(|r| r.value().clone()))
            .collect())
    }
}

/// In-memory search index.
///
/// Stores documents as JSON values keyed by id, the way a document-oriented
/// search engine would, so an upsert of the same id replaces the projection.
pub struct InMemoryIndex {
    docs: DashMap<i64, Value>,
    write_calls: AtomicUsize,
    last_batch_len: AtomicUsize,
}

impl InMemoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
            write_calls: AtomicUsize::new(0),
            last_batch_len: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Fetch a stored projection back out (test observation point).
    #[must_use]
    pub fn get(&self, id: i64) -> Option<Document> {
        self.docs
            .get(&id)
            .and_then(|v| serde_json::from_value(v.value().clone()).ok())
    }

    /// Number of `index_documents` calls accepted so far.
    #[must_use]
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Size of the most recent accepted batch.
    #[must_use]
    pub fn last_batch_len(&self) -> usize {
        self.last_batch_len.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    async fn index_documents(&self, documents: &[Document]) -> Result<(), StoreError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.last_batch_len.store(documents.len(), Ordering::SeqCst);

        for doc in documents {
            let value =
                serde_json::to_value(doc).map_err(|e| StoreError::Index(e.to_string()))?;
            self.docs.insert(doc.id, value);
        }
        Ok(())
    }
}
