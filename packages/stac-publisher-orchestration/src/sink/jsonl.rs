//! JSON-lines spool sink
//!
//! Each routing key maps to `<directory>/<routing_key>.jsonl`; every publish
//! appends one line. A downstream forwarder (or the consumer itself) tails
//! the files.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::{QueueSink, SinkChannel, SinkError};

pub struct JsonLinesSink {
    directory: PathBuf,
}

impl JsonLinesSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File backing a routing key
    pub fn file_for(&self, routing_key: &str) -> Result<PathBuf, SinkError> {
        validate_routing_key(routing_key)?;
        Ok(self.directory.join(format!("{}.jsonl", routing_key)))
    }
}

fn validate_routing_key(routing_key: &str) -> Result<(), SinkError> {
    let bad = routing_key.is_empty()
        || routing_key.starts_with('.')
        || routing_key.contains(['/', '\\'])
        || routing_key.chars().any(char::is_control);
    if bad {
        return Err(SinkError::InvalidRoutingKey(routing_key.to_string()));
    }
    Ok(())
}

#[async_trait]
impl QueueSink for JsonLinesSink {
    async fn open(&self) -> Result<Box<dyn SinkChannel>, SinkError> {
        tokio::fs::create_dir_all(&self.directory).await.map_err(|e| {
            SinkError::Unavailable(format!(
                "cannot create spool directory {}: {}",
                self.directory.display(),
                e
            ))
        })?;
        debug!("Opened spool channel in {}", self.directory.display());
        Ok(Box::new(JsonLinesChannel {
            directory: self.directory.clone(),
            writers: HashMap::new(),
            closed: false,
        }))
    }
}

struct JsonLinesChannel {
    directory: PathBuf,
    writers: HashMap<String, BufWriter<File>>,
    closed: bool,
}

impl JsonLinesChannel {
    async fn writer(&mut self, routing_key: &str) -> Result<&mut BufWriter<File>, SinkError> {
        if !self.writers.contains_key(routing_key) {
            validate_routing_key(routing_key)?;
            let path = self.directory.join(format!("{}.jsonl", routing_key));
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            self.writers
                .insert(routing_key.to_string(), BufWriter::new(file));
        }
        self.writers
            .get_mut(routing_key)
            .ok_or(SinkError::ChannelClosed)
    }
}

#[async_trait]
impl SinkChannel for JsonLinesChannel {
    async fn publish(&mut self, routing_key: &str, payload: &[u8]) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::ChannelClosed);
        }
        if payload.contains(&b'\n') {
            return Err(SinkError::InvalidPayload(
                "payload contains a line break".to_string(),
            ));
        }

        let writer = self.writer(routing_key).await?;
        writer.write_all(payload).await?;
        writer.write_all(b"\n").await?;
        // Each accepted message must be on disk before the next step
        writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        for (_, mut writer) in self.writers.drain() {
            writer.flush().await?;
            writer.into_inner().sync_all().await?;
        }
        Ok(())
    }
}
