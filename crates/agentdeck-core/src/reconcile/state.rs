//! Reconciliation phases and the transitions between them.
//!
//! ```text
//! Idle -> Applying -> WaitingHealthy -> Ready
//!            |              |
//!            +--------------+--> Failed | Cancelled
//! ```
//!
//! `Applying` may go straight to `Ready` when no readiness wait is configured.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::ReconcileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePhase {
    Idle,
    Applying,
    WaitingHealthy,
    Ready,
    Failed,
    Cancelled,
}

impl ReconcilePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcilePhase::Idle => "idle",
            ReconcilePhase::Applying => "applying",
            ReconcilePhase::WaitingHealthy => "waiting_healthy",
            ReconcilePhase::Ready => "ready",
            ReconcilePhase::Failed => "failed",
            ReconcilePhase::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReconcilePhase::Ready | ReconcilePhase::Failed | ReconcilePhase::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: ReconcilePhase) -> bool {
        use ReconcilePhase::*;
        matches!(
            (self, next),
            (Idle, Applying)
                | (Applying, WaitingHealthy | Ready | Failed | Cancelled)
                | (WaitingHealthy, Ready | Failed | Cancelled)
        )
    }
}

impl fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTransition {
    pub phase: ReconcilePhase,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReconcileStateMachine {
    phase: ReconcilePhase,
    transitions: Vec<PhaseTransition>,
}

impl Default for ReconcileStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconcileStateMachine {
    pub fn new() -> Self {
        Self {
            phase: ReconcilePhase::Idle,
            transitions: vec![PhaseTransition {
                phase: ReconcilePhase::Idle,
                at: Utc::now(),
            }],
        }
    }

    pub fn phase(&self) -> ReconcilePhase {
        self.phase
    }

    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<PhaseTransition> {
        self.transitions
    }

    pub fn transition(&mut self, next: ReconcilePhase) -> Result<(), ReconcileError> {
        if !self.phase.can_transition_to(next) {
            return Err(ReconcileError::InvalidTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }
        debug!(from = %self.phase, to = %next, "Reconcile phase change");
        self.phase = next;
        self.transitions.push(PhaseTransition {
            phase: next,
            at: Utc::now(),
        });
        Ok(())
    }

    /// Move to `Cancelled` or `Failed` depending on the error.
    pub fn abort(&mut self, error: &ReconcileError) {
        let next = if error.is_cancelled() {
            ReconcilePhase::Cancelled
        } else {
            ReconcilePhase::Failed
        };
        if self.phase.can_transition_to(next) {
            // Only fails for terminal phases, which were just checked
            let _ = self.transition(next);
        }
    }
}
