use stac_publisher_storage::StorageError;
use thiserror::Error;

use crate::sink::SinkError;

pub type Result<T> = std::result::Result<T, PublisherError>;

/// Cycle failure. `Publish::published` and `Update::marked` count the work
/// that already took effect before the failure.
#[derive(Error, Debug)]
pub enum PublisherError {
    #[error("Query failed: {0}")]
    Query(#[source] StorageError),

    #[error("Malformed hit {doc_id}: {reason}")]
    MalformedHit { doc_id: String, reason: String },

    #[error("Publish failed after {published} message(s): {source}")]
    Publish {
        published: usize,
        #[source]
        source: SinkError,
    },

    #[error("Status update failed after {marked} identifier(s): {source}")]
    Update {
        marked: usize,
        #[source]
        source: StorageError,
    },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PublisherError {
    pub fn serialization<E: std::fmt::Display>(e: E) -> Self {
        Self::Serialization(e.to_string())
    }

    pub fn config<E: std::fmt::Display>(e: E) -> Self {
        Self::Config(e.to_string())
    }

    pub fn malformed_hit(doc_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedHit {
            doc_id: doc_id.into(),
            reason: reason.into(),
        }
    }

    /// Classify for the invoking scheduler
    pub fn category(&self) -> ErrorCategory {
        match self {
            PublisherError::Query(_)
            | PublisherError::Publish { .. }
            | PublisherError::Update { .. } => ErrorCategory::Transient,
            PublisherError::MalformedHit { .. }
            | PublisherError::InvalidStateTransition { .. }
            | PublisherError::Config(_)
            | PublisherError::Yaml(_)
            | PublisherError::Serialization(_) => ErrorCategory::Permanent,
        }
    }
}

/// Error category reported to the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// The next cycle may succeed (backend unreachable, channel closed)
    Transient,
    /// Repeating the cycle will fail the same way (bad config, malformed documents)
    Permanent,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
        }
    }

    /// Process exit code for a failed cycle
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCategory::Transient => 1,
            ErrorCategory::Permanent => 2,
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
