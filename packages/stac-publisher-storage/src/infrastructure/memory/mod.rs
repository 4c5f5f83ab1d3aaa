//! In-memory DocumentSource
//!
//! Documents are kept in a `BTreeMap` keyed by document ID, so pagination
//! uses the last returned ID as its cursor (keyset pagination).

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use tracing::debug;

use crate::domain::{
    lookup_field, Document, DocumentSource, PageCursor, SearchHit, SearchPage, SearchQuery,
    StatusUpdate, UpdateOutcome,
};
use crate::{Result, StorageError};

pub struct InMemoryDocumentSource {
    documents: RwLock<BTreeMap<String, Document>>,
}

impl InMemoryDocumentSource {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let source = Self::new();
        for doc in documents {
            source.upsert(doc);
        }
        source
    }

    /// Insert or replace a document
    pub fn upsert(&self, document: Document) {
        self.documents.write().insert(document.id.clone(), document);
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl Default for InMemoryDocumentSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentSource for InMemoryDocumentSource {
    async fn search(
        &self,
        query: &SearchQuery,
        cursor: Option<&PageCursor>,
    ) -> Result<SearchPage> {
        if query.page_size == 0 {
            return Err(StorageError::invalid_query("page_size must be positive"));
        }

        let documents = self.documents.read();
        let total = documents.values().filter(|doc| query.matches(doc)).count() as u64;

        let lower = match cursor {
            Some(c) => Bound::Excluded(c.as_str().to_string()),
            None => Bound::Unbounded,
        };

        let mut remaining = documents
            .range((lower, Bound::Unbounded))
            .map(|(_, doc)| doc)
            .filter(|doc| query.matches(doc));

        let hits: Vec<SearchHit> = remaining
            .by_ref()
            .take(query.page_size)
            .map(SearchHit::from)
            .collect();

        let next = if remaining.next().is_some() {
            hits.last().map(|hit| PageCursor::new(hit.id.clone()))
        } else {
            None
        };

        debug!(
            "In-memory search ({} {}): {} hits, total {}",
            query.range.op,
            query.range.cutoff,
            hits.len(),
            total
        );

        Ok(SearchPage { hits, total, next })
    }

    async fn update_by_query(&self, update: &StatusUpdate) -> Result<UpdateOutcome> {
        if update.field.is_empty() {
            return Err(StorageError::invalid_query("update field must not be empty"));
        }

        let wanted: HashSet<&str> = update.values.iter().map(String::as_str).collect();
        let mut outcome = UpdateOutcome::default();

        for doc in self.documents.write().values_mut() {
            let matched = lookup_field(&doc.source, &update.field)
                .and_then(|value| value.as_str())
                .is_some_and(|value| wanted.contains(value));

            if !matched || !update.covers(&doc.status) {
                continue;
            }
            outcome.matched += 1;
            if doc.status == update.from && doc.status != update.status {
                doc.status = update.status.clone();
                outcome.updated += 1;
            }
        }

        Ok(outcome)
    }
}
