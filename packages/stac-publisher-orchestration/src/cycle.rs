use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorCategory, PublisherError, Result};

/// Step of a publish cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStep {
    Select,
    Filter,
    Publish,
    Mark,
}

impl CycleStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStep::Select => "select",
            CycleStep::Filter => "filter",
            CycleStep::Publish => "publish",
            CycleStep::Mark => "mark",
        }
    }

    /// Step that follows this one, `None` after marking
    pub fn next(&self) -> Option<CycleStep> {
        match self {
            CycleStep::Select => Some(CycleStep::Filter),
            CycleStep::Filter => Some(CycleStep::Publish),
            CycleStep::Publish => Some(CycleStep::Mark),
            CycleStep::Mark => None,
        }
    }
}

impl std::fmt::Display for CycleStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleState {
    Pending,
    Running {
        started_at: DateTime<Utc>,
        step: CycleStep,
    },
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        duration_ms: u64,
    },
    Failed {
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
        failed_step: CycleStep,
        error: String,
        error_category: ErrorCategory,
    },
}

impl CycleState {
    pub fn state_name(&self) -> &'static str {
        match self {
            CycleState::Pending => "pending",
            CycleState::Running { .. } => "running",
            CycleState::Completed { .. } => "completed",
            CycleState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CycleState::Completed { .. } | CycleState::Failed { .. })
    }
}

/// One invocation of the publisher
#[derive(Debug, Clone)]
pub struct Cycle {
    pub id: Uuid,
    pub cutoff: DateTime<Utc>,
    pub state: CycleState,
}

impl Cycle {
    pub fn new(cutoff: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            cutoff,
            state: CycleState::Pending,
        }
    }
}

/// Enforces `select -> filter -> publish -> mark` with no skips or reordering
pub struct CycleStateMachine {
    cycle: Cycle,
}

impl CycleStateMachine {
    pub fn new(cycle: Cycle) -> Self {
        Self { cycle }
    }

    pub fn cycle(&self) -> &Cycle {
        &self.cycle
    }

    pub fn into_cycle(self) -> Cycle {
        self.cycle
    }

    fn invalid(&self, to: &str) -> PublisherError {
        PublisherError::InvalidStateTransition {
            from: match &self.cycle.state {
                CycleState::Running { step, .. } => format!("running({})", step),
                other => other.state_name().to_string(),
            },
            to: to.to_string(),
        }
    }

    /// Transition: PENDING → RUNNING(select)
    pub fn start(&mut self) -> Result<()> {
        match &self.cycle.state {
            CycleState::Pending => {
                self.cycle.state = CycleState::Running {
                    started_at: Utc::now(),
                    step: CycleStep::Select,
                };
                Ok(())
            }
            _ => Err(self.invalid("running(select)")),
        }
    }

    /// Transition: RUNNING(step) → RUNNING(next step)
    pub fn advance(&mut self, to: CycleStep) -> Result<()> {
        match &self.cycle.state {
            CycleState::Running { started_at, step } if step.next() == Some(to) => {
                self.cycle.state = CycleState::Running {
                    started_at: *started_at,
                    step: to,
                };
                Ok(())
            }
            _ => Err(self.invalid(&format!("running({})", to))),
        }
    }

    /// Transition: RUNNING(mark) → COMPLETED
    pub fn complete(&mut self) -> Result<()> {
        match &self.cycle.state {
            CycleState::Running {
                started_at,
                step: CycleStep::Mark,
            } => {
                let now = Utc::now();
                self.cycle.state = CycleState::Completed {
                    started_at: *started_at,
                    completed_at: now,
                    duration_ms: (now - *started_at).num_milliseconds().max(0) as u64,
                };
                Ok(())
            }
            _ => Err(self.invalid("completed")),
        }
    }

    /// Transition: RUNNING(step) → FAILED
    pub fn fail(&mut self, error: &PublisherError) -> Result<()> {
        match &self.cycle.state {
            CycleState::Running { started_at, step } => {
                self.cycle.state = CycleState::Failed {
                    started_at: *started_at,
                    failed_at: Utc::now(),
                    failed_step: *step,
                    error: error.to_string(),
                    error_category: error.category(),
                };
                Ok(())
            }
            _ => Err(self.invalid("failed")),
        }
    }

    /// Step currently running, if any
    pub fn current_step(&self) -> Option<CycleStep> {
        match &self.cycle.state {
            CycleState::Running { step, .. } => Some(*step),
            _ => None,
        }
    }
}
