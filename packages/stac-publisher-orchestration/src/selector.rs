//! Stabilization selector
//!
//! Runs one filtered search (`status == new` AND `mod_time <op> cutoff`) and
//! follows the source's cursor until every page has been read.

use chrono::{DateTime, Utc};
use stac_publisher_storage::{
    DocumentSource, DocumentStatus, PageCursor, RangeOp, SearchHit, SearchQuery, TimeRange,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{PublisherError, Result};
use crate::message::{CandidateSet, Message};

/// Field carrying the payload reference in every document body
pub const DESCRIPTION_PATH_FIELD: &str = "description_path";

pub struct StabilizationSelector {
    source: Arc<dyn DocumentSource>,
    id_key: String,
    page_size: usize,
}

impl StabilizationSelector {
    pub fn new(source: Arc<dyn DocumentSource>, id_key: impl Into<String>, page_size: usize) -> Self {
        Self {
            source,
            id_key: id_key.into(),
            page_size,
        }
    }

    /// Collect every `new` document whose `mod_time` satisfies `op` against `cutoff`
    pub async fn select(&self, op: RangeOp, cutoff: DateTime<Utc>) -> Result<CandidateSet> {
        let query = SearchQuery::new(
            DocumentStatus::New,
            TimeRange::new(op, cutoff),
            self.page_size,
        );

        debug!("Querying source: mod_time {} {}", op, cutoff);

        let mut candidates = CandidateSet::new();
        let mut cursor: Option<PageCursor> = None;
        let mut pages = 0usize;
        let mut total = 0u64;

        loop {
            let page = self
                .source
                .search(&query, cursor.as_ref())
                .await
                .map_err(PublisherError::Query)?;
            pages += 1;
            if pages == 1 {
                total = page.total;
            }

            for hit in &page.hits {
                let message = message_from_hit(hit, &self.id_key)?;
                debug!(
                    "Hit for {} : {} : {}",
                    self.id_key, message.uri, hit.id
                );
                if let Some(previous) = candidates.insert(message) {
                    debug!("Duplicate hit for {}, keeping latest", previous.uri);
                }
            }

            match page.next {
                Some(next) if cursor.as_ref() == Some(&next) => {
                    return Err(PublisherError::Query(
                        stac_publisher_storage::StorageError::invalid_query(format!(
                            "source returned the same cursor twice: {}",
                            next.as_str()
                        )),
                    ));
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(
            "Source count ({} {}): {} total, {} candidates over {} page(s)",
            op,
            cutoff,
            total,
            candidates.len(),
            pages
        );

        Ok(candidates)
    }
}

/// Project a hit onto the outbound message
fn message_from_hit(hit: &SearchHit, id_key: &str) -> Result<Message> {
    let uri = hit
        .field(id_key)
        .ok_or_else(|| PublisherError::malformed_hit(&hit.id, format!("missing field {}", id_key)))?
        .as_str()
        .ok_or_else(|| {
            PublisherError::malformed_hit(&hit.id, format!("field {} is not a string", id_key))
        })?;

    let description_path = hit
        .field(DESCRIPTION_PATH_FIELD)
        .and_then(|value| value.as_str())
        .ok_or_else(|| {
            PublisherError::malformed_hit(
                &hit.id,
                format!("missing string field {}", DESCRIPTION_PATH_FIELD),
            )
        })?;

    Ok(Message::new(uri, description_path))
}
