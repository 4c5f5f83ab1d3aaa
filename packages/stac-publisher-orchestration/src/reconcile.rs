//! Status reconciler
//!
//! Marks published documents as `queued` with bulk `update_by_query`
//! requests, `batch_size` identifiers at a time. Only `new` documents move;
//! any other status sharing an identifier is left as is.

use stac_publisher_storage::{DocumentSource, DocumentStatus, StatusUpdate};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{PublisherError, Result};
use crate::message::Message;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Bulk requests issued
    pub requests: usize,
    /// Identifiers submitted
    pub submitted: usize,
    /// Documents matched by the source
    pub matched: u64,
    /// Documents whose status changed
    pub updated: u64,
}

pub struct StatusReconciler {
    source: Arc<dyn DocumentSource>,
    id_key: String,
    batch_size: usize,
}

impl StatusReconciler {
    pub fn new(source: Arc<dyn DocumentSource>, id_key: impl Into<String>, batch_size: usize) -> Self {
        Self {
            source,
            id_key: id_key.into(),
            batch_size: batch_size.max(1),
        }
    }

    pub async fn mark_queued(&self, messages: &[Message]) -> Result<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome::default();
        if messages.is_empty() {
            debug!("No identifiers to mark");
            return Ok(outcome);
        }

        let ids: Vec<String> = messages.iter().map(|m| m.uri.clone()).collect();
        info!("Updating {} identifier(s) to queued", ids.len());
        debug!("Updating ids: {:?}", ids);

        for chunk in ids.chunks(self.batch_size) {
            let update = StatusUpdate::new(
                &self.id_key,
                chunk.to_vec(),
                DocumentStatus::New,
                DocumentStatus::Queued,
            );
            let result = self
                .source
                .update_by_query(&update)
                .await
                .map_err(|source| PublisherError::Update {
                    marked: outcome.submitted,
                    source,
                })?;

            outcome.requests += 1;
            outcome.submitted += chunk.len();
            outcome.matched += result.matched;
            outcome.updated += result.updated;
        }

        if outcome.matched < ids.len() as u64 {
            warn!(
                "Only {} of {} published identifier(s) matched a document",
                outcome.matched,
                ids.len()
            );
        }

        Ok(outcome)
    }
}
