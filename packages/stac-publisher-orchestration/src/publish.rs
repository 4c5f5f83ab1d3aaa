//! Publish driver
//!
//! Opens one sink channel for the whole batch, publishes sequentially under
//! a fixed routing key and closes the channel on every exit path.
//!
//! Failure policy is fail-fast: the first rejected message ends the batch.
//! Messages accepted before the failure stay published.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{PublisherError, Result};
use crate::message::Message;
use crate::sink::{QueueSink, SinkError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub published: usize,
}

pub struct PublishDriver {
    sink: Arc<dyn QueueSink>,
    routing_key: String,
}

impl PublishDriver {
    pub fn new(sink: Arc<dyn QueueSink>, routing_key: impl Into<String>) -> Self {
        Self {
            sink,
            routing_key: routing_key.into(),
        }
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub async fn publish(&self, messages: &[Message]) -> Result<PublishOutcome> {
        if messages.is_empty() {
            info!("No messages to publish");
            return Ok(PublishOutcome::default());
        }

        // Encode the whole batch before the channel opens
        let payloads = messages
            .iter()
            .map(Message::to_payload)
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Publishing {} message(s) to {}",
            messages.len(),
            self.routing_key
        );

        let mut channel = self
            .sink
            .open()
            .await
            .map_err(|source| PublisherError::Publish {
                published: 0,
                source,
            })?;

        let mut published = 0usize;
        let mut failure: Option<SinkError> = None;

        for (message, payload) in messages.iter().zip(&payloads) {
            match channel.publish(&self.routing_key, payload).await {
                Ok(()) => {
                    published += 1;
                    debug!("Published {} -> {}", message.uri, self.routing_key);
                }
                Err(e) => {
                    error!(
                        "Publish of {} failed after {} message(s): {}",
                        message.uri, published, e
                    );
                    failure = Some(e);
                    break;
                }
            }
        }

        let closed = channel.close().await;

        if let Some(source) = failure {
            if let Err(close_err) = closed {
                warn!("Closing channel after failed publish also failed: {}", close_err);
            }
            return Err(PublisherError::Publish { published, source });
        }

        closed.map_err(|source| PublisherError::Publish { published, source })?;

        Ok(PublishOutcome { published })
    }
}
