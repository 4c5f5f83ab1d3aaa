//! Queue sink port
//!
//! A sink hands out channels; a channel publishes payloads under a routing
//! key until it is closed. The publish driver owns exactly one channel per
//! batch.

use async_trait::async_trait;
use thiserror::Error;

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Invalid routing key: {0}")]
    InvalidRoutingKey(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Open channel to the queue
#[async_trait]
pub trait SinkChannel: Send {
    /// Publish one payload; returns once the sink has accepted it
    async fn publish(&mut self, routing_key: &str, payload: &[u8]) -> Result<(), SinkError>;

    /// Flush and release the channel. Further publishes fail with `ChannelClosed`.
    async fn close(&mut self) -> Result<(), SinkError>;
}

/// Queue producer
#[async_trait]
pub trait QueueSink: Send + Sync {
    async fn open(&self) -> Result<Box<dyn SinkChannel>, SinkError>;
}
