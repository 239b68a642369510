//! Repair loop state machine and run reporting types.
//!
//! The loop is an explicit state machine rather than a for-loop with a
//! fallthrough clause: "broke out on success" and "ran out of budget" are
//! distinct terminal states, distinguishable by type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// States of the repair loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairState {
    /// Asking the generation backend for a new artifact pair.
    Generating,
    /// Parsing the response and persisting the artifact files.
    Extracting,
    /// Running the build+simulate toolchain.
    Verifying,
    /// Verification passed; handoff triggered. Terminal.
    Succeeded,
    /// This iteration failed; feedback is being folded into history.
    FailedIteration,
    /// Budget spent without a passing run. Terminal.
    Exhausted,
}

impl RepairState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RepairState::Succeeded | RepairState::Exhausted)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_advance_to(self, next: RepairState) -> bool {
        use RepairState::{Exhausted, Extracting, FailedIteration, Generating, Succeeded, Verifying};
        matches!(
            (self, next),
            (Generating, Extracting)
                // Generation backend failure skips straight to the failed state.
                | (Generating, FailedIteration)
                | (Extracting, Verifying)
                | (Extracting, FailedIteration)
                | (Verifying, Succeeded)
                | (Verifying, FailedIteration)
                | (FailedIteration, Generating)
                | (FailedIteration, Exhausted)
        )
    }
}

impl std::fmt::Display for RepairState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepairState::Generating => write!(f, "generating"),
            RepairState::Extracting => write!(f, "extracting"),
            RepairState::Verifying => write!(f, "verifying"),
            RepairState::Succeeded => write!(f, "succeeded"),
            RepairState::FailedIteration => write!(f, "failed_iteration"),
            RepairState::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// How a single iteration ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationVerdict {
    /// Verification passed.
    Passed,
    /// Simulation ran and reported failure (or passed silently without the
    /// pass marker, which counts the same).
    SimulationFailed,
    /// The generation backend call itself failed.
    GenerationFailed,
    /// The response contained a malformed delimited block.
    ExtractionRejected,
}

impl std::fmt::Display for IterationVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IterationVerdict::Passed => write!(f, "passed"),
            IterationVerdict::SimulationFailed => write!(f, "simulation failed"),
            IterationVerdict::GenerationFailed => write!(f, "generation failed"),
            IterationVerdict::ExtractionRejected => write!(f, "extraction rejected"),
        }
    }
}

/// Record of one loop iteration, kept for the end-of-run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration number.
    pub index: u32,
    pub verdict: IterationVerdict,
    /// Short human-readable detail (error message or pass note).
    pub detail: String,
    pub completed_at: DateTime<Utc>,
}

/// Outcome of the physical-design handoff after a verified success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutStatus {
    Completed,
    Failed { reason: String },
    Disabled,
}

/// Terminal outcome of a repair run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RepairOutcome {
    /// A verification run passed within budget.
    Fixed {
        /// Iterations consumed, including the passing one.
        iterations: u32,
        layout: LayoutStatus,
    },
    /// The budget ran out without a passing run. A normal, reportable
    /// result, not an error.
    Exhausted { iterations: u32 },
}

impl RepairOutcome {
    pub fn is_fixed(&self) -> bool {
        matches!(self, RepairOutcome::Fixed { .. })
    }
}

/// Full report of a repair run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RepairOutcome,
    pub iterations: Vec<IterationRecord>,
    /// History entries accumulated (two per failed iteration that produced
    /// feedback).
    pub history_entries: usize,
}
