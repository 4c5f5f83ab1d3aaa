/*
 * STAC Publisher Orchestration - stabilization-driven queue publishing
 *
 * Polls a document source for `new` documents that stopped changing and
 * publishes one message per document, then marks it `queued`.
 *
 * Cycle:
 * - Select: two range searches around the cutoff (paged)
 * - Filter: drop identifiers seen on both sides of the cutoff
 * - Publish: one sink channel per batch, fail-fast
 * - Mark: bulk `status = queued` over the published identifiers
 *
 * Delivery is at-least-once; consumers deduplicate on `uri`.
 */

// Public modules
pub mod config;
pub mod cycle;
pub mod drift;
pub mod error;
pub mod message;
pub mod orchestrator;
pub mod publish;
pub mod reconcile;
pub mod selector;
pub mod sink;

// Re-exports
pub use config::{AppConfig, LoggingConfig, PublisherConfig, SinkConfig, SourceConfig};
pub use cycle::{Cycle, CycleState, CycleStateMachine, CycleStep};
pub use drift::DriftOutcome;
pub use error::{ErrorCategory, PublisherError, Result};
pub use message::{CandidateSet, Message};
pub use orchestrator::{CycleOrchestrator, CycleReport};
pub use publish::{PublishDriver, PublishOutcome};
pub use reconcile::{ReconcileOutcome, StatusReconciler};
pub use selector::StabilizationSelector;
pub use sink::{JsonLinesSink, MemorySink, QueueSink, SinkChannel, SinkError};
