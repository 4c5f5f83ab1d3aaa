//! In-memory queue sink
//!
//! Records every accepted `(routing_key, payload)` pair and counts channel
//! opens/closes. Failures can be injected to exercise partial batches.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use super::{QueueSink, SinkChannel, SinkError};
use crate::message::Message;

#[derive(Debug, Default)]
struct MemorySinkState {
    published: Vec<(String, Vec<u8>)>,
    opened: usize,
    closed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemorySinkState>>,
    /// Each channel rejects publishes after this many successes
    fail_after: Option<usize>,
    unavailable: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose channels accept `n` messages and then fail
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// Sink that cannot be opened
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().published.clone()
    }

    /// Accepted payloads decoded as messages (undecodable payloads are skipped)
    pub fn messages(&self) -> Vec<Message> {
        self.state
            .lock()
            .published
            .iter()
            .filter_map(|(_, payload)| serde_json::from_slice(payload).ok())
            .collect()
    }

    pub fn opened(&self) -> usize {
        self.state.lock().opened
    }

    pub fn closed(&self) -> usize {
        self.state.lock().closed
    }
}

#[async_trait]
impl QueueSink for MemorySink {
    async fn open(&self) -> Result<Box<dyn SinkChannel>, SinkError> {
        if self.unavailable {
            return Err(SinkError::Unavailable("memory sink disabled".to_string()));
        }
        self.state.lock().opened += 1;
        Ok(Box::new(MemoryChannel {
            state: self.state.clone(),
            fail_after: self.fail_after,
            sent: 0,
            closed: false,
        }))
    }
}

struct MemoryChannel {
    state: Arc<Mutex<MemorySinkState>>,
    fail_after: Option<usize>,
    sent: usize,
    closed: bool,
}

#[async_trait]
impl SinkChannel for MemoryChannel {
    async fn publish(&mut self, routing_key: &str, payload: &[u8]) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::ChannelClosed);
        }
        if self.fail_after.is_some_and(|limit| self.sent >= limit) {
            return Err(SinkError::ChannelClosed);
        }
        self.state
            .lock()
            .published
            .push((routing_key.to_string(), payload.to_vec()));
        self.sent += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if !self.closed {
            self.closed = true;
            self.state.lock().closed += 1;
        }
        Ok(())
    }
}
