use chrono::{DateTime, Utc};
use stac_publisher_storage::{DocumentSource, RangeOp};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::PublisherConfig;
use crate::cycle::{Cycle, CycleStateMachine, CycleStep};
use crate::drift;
use crate::error::Result;
use crate::publish::PublishDriver;
use crate::reconcile::StatusReconciler;
use crate::selector::StabilizationSelector;
use crate::sink::QueueSink;

/// Cycle result (counts from every step)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub cutoff: DateTime<Utc>,
    /// Candidates at or before the cutoff
    pub old_candidates: usize,
    /// Candidates strictly after the cutoff
    pub young_candidates: usize,
    /// Old candidates excluded because they were also young
    pub drifted: Vec<String>,
    pub published: usize,
    pub marked: u64,
    pub duration_ms: u64,
}

/// Drives one select → filter → publish → mark pass per invocation.
///
/// Only one cycle may run against a given source/sink pair at a time;
/// overlapping cycles can publish the same document twice. Delivery is
/// at-least-once: a failed status update leaves published documents `new`
/// and the next cycle publishes them again.
pub struct CycleOrchestrator {
    config: PublisherConfig,
    selector: StabilizationSelector,
    driver: PublishDriver,
    reconciler: StatusReconciler,
}

impl CycleOrchestrator {
    pub fn new(
        config: PublisherConfig,
        source: Arc<dyn DocumentSource>,
        sink: Arc<dyn QueueSink>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            selector: StabilizationSelector::new(
                source.clone(),
                config.id_key.clone(),
                config.page_size,
            ),
            driver: PublishDriver::new(sink, config.routing_key.clone()),
            reconciler: StatusReconciler::new(
                source,
                config.id_key.clone(),
                config.update_batch_size,
            ),
            config,
        })
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Run one cycle with the cutoff derived from the current time
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle as if the current time were `now`
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let cutoff = self.config.cutoff_before(now)?;
        let cycle = Cycle::new(cutoff);
        let cycle_id = cycle.id;
        let start_time = Instant::now();

        info!("Starting cycle {} (cutoff: {})", cycle_id, cutoff);

        let mut sm = CycleStateMachine::new(cycle);
        sm.start()?;

        match self.run_steps(&mut sm, cycle_id, cutoff).await {
            Ok(mut report) => {
                sm.complete()?;
                report.duration_ms = start_time.elapsed().as_millis() as u64;

                info!(
                    "Cycle {} completed - {} old, {} young, {} drifted, {} published, {} marked in {}ms",
                    cycle_id,
                    report.old_candidates,
                    report.young_candidates,
                    report.drifted.len(),
                    report.published,
                    report.marked,
                    report.duration_ms
                );
                Ok(report)
            }
            Err(e) => {
                let step = sm.current_step();
                if let Err(transition) = sm.fail(&e) {
                    warn!("Cycle {}: could not record failure: {}", cycle_id, transition);
                }
                error!(
                    "Cycle {} failed during {} ({}): {}",
                    cycle_id,
                    step.map(|s| s.as_str()).unwrap_or("setup"),
                    e.category(),
                    e
                );
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        sm: &mut CycleStateMachine,
        cycle_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<CycleReport> {
        let mut report = CycleReport {
            cycle_id,
            cutoff,
            ..Default::default()
        };

        // Select
        let old = self.selector.select(RangeOp::AtOrBefore, cutoff).await?;
        let young = self.selector.select(RangeOp::StrictlyAfter, cutoff).await?;
        report.old_candidates = old.len();
        report.young_candidates = young.len();

        // Filter
        sm.advance(CycleStep::Filter)?;
        let outcome = drift::partition(old, &young);
        if !outcome.drifted.is_empty() {
            info!(
                "Cycle {}: {} document(s) still changing, deferred: {:?}",
                cycle_id,
                outcome.drifted.len(),
                outcome.drifted
            );
        }
        report.drifted = outcome.drifted;
        let messages = outcome.stable;

        // Publish
        sm.advance(CycleStep::Publish)?;
        let published = self.driver.publish(&messages).await?;
        report.published = published.published;

        // Mark
        sm.advance(CycleStep::Mark)?;
        let reconciled = self.reconciler.mark_queued(&messages).await?;
        report.marked = reconciled.updated;

        Ok(report)
    }
}
