//! Search-facing document projection and change events.
//!
//! A [`Document`] is the denormalized representation of an article that gets
//! written to the search index: author resolved to a display name, tags
//! flattened to their labels. It is derived from relational state at
//! reconciliation time and never persisted by this crate.
//!
//! # Example
//!
//! ```
//! use index_sync::{ArticleRecord, Document};
//!
//! let record = ArticleRecord {
//!     id: 42,
//!     title: "Borrow checker field notes".into(),
//!     body: "...".into(),
//!     author_name: "Mara Vos".into(),
//!     tag_labels: vec!["rust".into(), "compilers".into()],
//! };
//!
//! let doc = Document::from(record);
//! assert_eq!(doc.id, 42);
//! assert_eq!(doc.tags, vec!["rust", "compilers"]);
//! ```

use serde::{Deserialize, Serialize};

/// Denormalized article projection written to the search index.
///
/// The document id doubles as the index primary key: re-indexing the same id
/// overwrites the stored projection (last write wins), which is what makes
/// reconciliation safe to retry and to run concurrently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub body: String,
    /// Author display name, already resolved from the author row.
    pub author: String,
    /// Tag labels, already resolved from the tag rows.
    pub tags: Vec<String>,
}

/// An article as the relational store reports it for a tag membership query.
///
/// Same shape as [`Document`] but owned by the relational side; keeping the
/// two types separate keeps the projection step explicit.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub author_name: String,
    pub tag_labels: Vec<String>,
}

impl From<ArticleRecord> for Document {
    fn from(record: ArticleRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            body: record.body,
            author: record.author_name,
            tags: record.tag_labels,
        }
    }
}

/// A mutation event handed to the reconciler.
///
/// Immutable once constructed. `ArticlesChanged` carries the documents the
/// mutation handler already resolved; `TagChanged` deliberately carries only
/// the tag id, so membership is re-resolved against the relational store when
/// the reconciliation actually runs, not when it was dispatched.
#[derive(Debug, Clone)]
pub enum ChangeSet {
    ArticlesChanged(Vec<Document>),
    TagChanged(i64),
}

impl ChangeSet {
    /// Stable label for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ArticlesChanged(_) => "articles_changed",
            Self::TagChanged(_) => "tag_changed",
        }
    }
}
