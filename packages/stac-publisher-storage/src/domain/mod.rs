//! Domain layer for the document source
//!
//! # Domain Models
//!
//! - `Document`: an indexed document with a modification time and status facet
//! - `DocumentStatus`: the status facet (`new` documents are eligible for publishing)
//! - `SearchQuery` / `SearchPage`: filtered, cursor-paginated search
//! - `StatusUpdate`: bulk "set status where field in {values} and status = from" mutation
//!
//! # Port Trait
//!
//! - `DocumentSource`: primary source abstraction
//!
//! # Examples
//!
//! ```rust,ignore
//! use stac_publisher_storage::domain::{DocumentSource, DocumentStatus, RangeOp, SearchQuery, TimeRange};
//!
//! async fn example(source: impl DocumentSource, cutoff: DateTime<Utc>) -> Result<()> {
//!     let query = SearchQuery::new(DocumentStatus::New, TimeRange::new(RangeOp::AtOrBefore, cutoff), 500);
//!     let mut cursor = None;
//!     loop {
//!         let page = source.search(&query, cursor.as_ref()).await?;
//!         // ... consume page.hits
//!         match page.next {
//!             Some(next) => cursor = Some(next),
//!             None => break,
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::Result;

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// Status facet of an indexed document
///
/// Only `New` documents are eligible for selection. The publisher moves a
/// document from `New` to `Queued` and never performs any other transition.
/// Values written by other systems are preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    New,
    Queued,
    Other(String),
}

impl DocumentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentStatus::New => "new",
            DocumentStatus::Queued => "queued",
            DocumentStatus::Other(s) => s.as_str(),
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "new" => DocumentStatus::New,
            "queued" => DocumentStatus::Queued,
            other => DocumentStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for DocumentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DocumentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DocumentStatus::parse(&s))
    }
}

/// Indexed document
///
/// `id` is the index-internal key. The business identifier published
/// downstream lives inside `source` under a configurable field path.
///
/// # Examples
///
/// ```rust
/// use chrono::Utc;
/// use stac_publisher_storage::domain::{Document, DocumentStatus};
///
/// let doc = Document::new(
///     "doc-1",
///     Utc::now(),
///     serde_json::json!({"item_id": "a", "description_path": "/data/a.json"}),
/// );
/// assert_eq!(doc.status, DocumentStatus::New);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Index-internal document ID
    pub id: String,
    /// Last modification time
    pub mod_time: DateTime<Utc>,
    /// Status facet
    pub status: DocumentStatus,
    /// Document body
    #[serde(default)]
    pub source: serde_json::Value,
}

impl Document {
    /// Create a new document with status `new`
    pub fn new(id: impl Into<String>, mod_time: DateTime<Utc>, source: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            mod_time,
            status: DocumentStatus::New,
            source,
        }
    }

    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = status;
        self
    }

    /// Resolve a dotted field path inside the document body
    pub fn field(&self, path: &str) -> Option<&serde_json::Value> {
        lookup_field(&self.source, path)
    }
}

/// Resolve a dotted path (`properties.item_id`) against a JSON value.
///
/// Returns `None` for an empty path or when any segment is missing.
pub fn lookup_field<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(value, |current, segment| current.get(segment))
}

/// Comparison applied to `mod_time` against the cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeOp {
    /// `mod_time <= cutoff`
    #[serde(rename = "lte")]
    AtOrBefore,
    /// `mod_time > cutoff`
    #[serde(rename = "gt")]
    StrictlyAfter,
}

impl RangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeOp::AtOrBefore => "lte",
            RangeOp::StrictlyAfter => "gt",
        }
    }

    pub fn matches(&self, mod_time: DateTime<Utc>, cutoff: DateTime<Utc>) -> bool {
        match self {
            RangeOp::AtOrBefore => mod_time <= cutoff,
            RangeOp::StrictlyAfter => mod_time > cutoff,
        }
    }
}

impl fmt::Display for RangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Range filter on `mod_time`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub op: RangeOp,
    pub cutoff: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(op: RangeOp, cutoff: DateTime<Utc>) -> Self {
        Self { op, cutoff }
    }

    pub fn contains(&self, mod_time: DateTime<Utc>) -> bool {
        self.op.matches(mod_time, self.cutoff)
    }
}

/// Filtered search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Exact-match status filter
    pub status: DocumentStatus,
    /// Range filter on `mod_time`
    pub range: TimeRange,
    /// Maximum hits per page
    pub page_size: usize,
}

impl SearchQuery {
    pub fn new(status: DocumentStatus, range: TimeRange, page_size: usize) -> Self {
        Self {
            status,
            range,
            page_size,
        }
    }

    /// Whether a document satisfies both filters
    pub fn matches(&self, doc: &Document) -> bool {
        doc.status == self.status && self.range.contains(doc.mod_time)
    }
}

/// Opaque continuation token returned by a source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor(pub String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Single search hit
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub mod_time: DateTime<Utc>,
    pub source: serde_json::Value,
}

impl SearchHit {
    pub fn field(&self, path: &str) -> Option<&serde_json::Value> {
        lookup_field(&self.source, path)
    }
}

impl From<&Document> for SearchHit {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            mod_time: doc.mod_time,
            source: doc.source.clone(),
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    /// Total matching documents at query time
    pub total: u64,
    /// Cursor for the next page (`None` = last page)
    pub next: Option<PageCursor>,
}

/// Bulk status mutation: move every document whose `field` value is one of
/// `values` from status `from` to `status`.
///
/// Documents in any other status are left alone even when their `field`
/// value matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub field: String,
    pub values: Vec<String>,
    pub from: DocumentStatus,
    pub status: DocumentStatus,
}

impl StatusUpdate {
    pub fn new(
        field: impl Into<String>,
        values: Vec<String>,
        from: DocumentStatus,
        status: DocumentStatus,
    ) -> Self {
        Self {
            field: field.into(),
            values,
            from,
            status,
        }
    }

    /// Whether a document currently in `current` is counted by this update
    pub fn covers(&self, current: &DocumentStatus) -> bool {
        *current == self.from || *current == self.status
    }
}

/// Result of a bulk status mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Documents matching the identifier set, in status `from` or already
    /// in the target status
    pub matched: u64,
    /// Documents whose status actually changed
    pub updated: u64,
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait: DocumentSource
// ═══════════════════════════════════════════════════════════════════════════

/// Searchable document store
///
/// # Core Operations
///
/// 1. `search`: status + `mod_time` range filter, paginated by cursor
/// 2. `update_by_query`: one bulk status mutation over an identifier set
///
/// # Implementations
///
/// - `InMemoryDocumentSource`: map-backed, for tests and embedding
/// - `SqliteDocumentSource`: SQLite adapter (feature `sqlite`)
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch one page of documents matching `query`
    ///
    /// Pass `None` for the first page and the previous page's `next`
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if:
    /// - `page_size` is zero or the cursor is not recognized
    /// - the underlying store fails
    async fn search(&self, query: &SearchQuery, cursor: Option<&PageCursor>)
        -> Result<SearchPage>;

    /// Apply a bulk status mutation
    ///
    /// Documents outside the identifier set, or not in status `from`, are
    /// never touched. Applying the
    /// same update twice leaves the store in the same state as applying it
    /// once.
    async fn update_by_query(&self, update: &StatusUpdate) -> Result<UpdateOutcome>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_roundtrip() {
        for status in [DocumentStatus::New, DocumentStatus::Queued] {
            assert_eq!(DocumentStatus::parse(status.as_str()), status);
        }
        assert_eq!(
            DocumentStatus::parse("aggregated"),
            DocumentStatus::Other("aggregated".to_string())
        );
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&DocumentStatus::Queued).unwrap();
        assert_eq!(json, "\"queued\"");

        let parsed: DocumentStatus = serde_json::from_str("\"new\"").unwrap();
        assert_eq!(parsed, DocumentStatus::New);
    }

    #[test]
    fn test_document_new_defaults_to_new() {
        let doc = Document::new("doc-1", Utc::now(), serde_json::json!({"item_id": "a"}));
        assert_eq!(doc.status, DocumentStatus::New);
        assert_eq!(doc.field("item_id"), Some(&serde_json::json!("a")));
    }

    #[test]
    fn test_lookup_nested_field() {
        let value = serde_json::json!({"properties": {"item_id": "abc"}});
        assert_eq!(
            lookup_field(&value, "properties.item_id"),
            Some(&serde_json::json!("abc"))
        );
        assert_eq!(lookup_field(&value, "properties.missing"), None);
        assert_eq!(lookup_field(&value, ""), None);
    }

    #[test]
    fn test_range_op_boundary() {
        let cutoff = Utc::now();
        let earlier = cutoff - Duration::seconds(1);
        let later = cutoff + Duration::seconds(1);

        assert!(RangeOp::AtOrBefore.matches(cutoff, cutoff));
        assert!(RangeOp::AtOrBefore.matches(earlier, cutoff));
        assert!(!RangeOp::AtOrBefore.matches(later, cutoff));

        assert!(!RangeOp::StrictlyAfter.matches(cutoff, cutoff));
        assert!(RangeOp::StrictlyAfter.matches(later, cutoff));
    }

    #[test]
    fn test_query_matches_requires_status() {
        let cutoff = Utc::now();
        let query = SearchQuery::new(
            DocumentStatus::New,
            TimeRange::new(RangeOp::AtOrBefore, cutoff),
            10,
        );

        let old = Document::new("a", cutoff - Duration::minutes(10), serde_json::Value::Null);
        assert!(query.matches(&old));
        assert!(!query.matches(&old.clone().with_status(DocumentStatus::Queued)));
    }
}
