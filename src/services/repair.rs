//! The repair loop orchestrator.
//!
//! Drives the fixed-budget generate -> extract -> verify cycle as an
//! explicit state machine. On failure it folds a log excerpt and a waveform
//! table into the conversation history; on the first verified success it
//! triggers the one-shot physical-design handoff and stops. Running out of
//! budget is a normal, reportable outcome.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ArtifactKind, Conversation, IterationRecord, IterationVerdict, LayoutStatus, RepairConfig,
    RepairOutcome, RepairReport, RepairState,
};
use crate::domain::ports::Generator;
use crate::services::extract::{ArtifactExtractor, ExtractError};
use crate::services::layout::LayoutHandoff;
use crate::services::simulate::{SimOutcome, VerificationRunner};
use crate::services::trace::WaveSampler;

// ---------------------------------------------------------------------------
// RepairEvent
// ---------------------------------------------------------------------------

/// Progress events emitted at phase transitions, for the CLI to render.
#[derive(Debug, Clone)]
pub enum RepairEvent {
    Started { budget: u32 },
    IterationStarted { index: u32 },
    IterationFailed { index: u32, verdict: IterationVerdict },
    VerificationPassed { index: u32 },
    LayoutFinished { status: LayoutStatus },
    Exhausted { iterations: u32 },
}

// ---------------------------------------------------------------------------
// RepairLoop
// ---------------------------------------------------------------------------

/// The iteration state machine over the four collaborator services.
pub struct RepairLoop {
    generator: Arc<dyn Generator>,
    extractor: ArtifactExtractor,
    runner: VerificationRunner,
    sampler: WaveSampler,
    handoff: LayoutHandoff,
    config: RepairConfig,
    top_module: String,
    events: Option<mpsc::UnboundedSender<RepairEvent>>,
}

impl RepairLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        generator: Arc<dyn Generator>,
        extractor: ArtifactExtractor,
        runner: VerificationRunner,
        sampler: WaveSampler,
        handoff: LayoutHandoff,
        config: RepairConfig,
        top_module: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            extractor,
            runner,
            sampler,
            handoff,
            config,
            top_module: top_module.into(),
            events: None,
        }
    }

    /// Attach a progress event channel.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<RepairEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn emit(&self, event: RepairEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Run the repair loop over `spec` until success or budget exhaustion.
    pub async fn run(&self, spec: &str) -> DomainResult<RepairReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let budget = self.config.max_iterations;

        let mut history = Conversation::new();
        let mut records: Vec<IterationRecord> = Vec::new();
        let mut state = RepairState::Generating;

        tracing::info!(%run_id, budget, generator = self.generator.name(), "Starting repair loop");
        self.emit(RepairEvent::Started { budget });

        for index in 1..=budget {
            self.emit(RepairEvent::IterationStarted { index });
            tracing::info!(iteration = index, "Iteration started");

            let fail = |records: &mut Vec<IterationRecord>, verdict: IterationVerdict, detail: String| {
                records.push(IterationRecord {
                    index,
                    verdict: verdict.clone(),
                    detail,
                    completed_at: Utc::now(),
                });
                self.emit(RepairEvent::IterationFailed { index, verdict });
            };

            // GENERATING
            let response = match self.generator.generate(history.turns(), spec).await {
                Ok(response) => response,
                Err(e) => {
                    // A dead backend call leaves no response to fold into
                    // history; the iteration is simply spent.
                    tracing::warn!(iteration = index, error = %e, "Generation call failed");
                    fail(&mut records, IterationVerdict::GenerationFailed, e.to_string());
                    advance(&mut state, RepairState::FailedIteration)?;
                    state = self.next_or_exhaust(state, index, budget)?;
                    continue;
                }
            };

            // EXTRACTING
            advance(&mut state, RepairState::Extracting)?;
            match self.extractor.extract(&response) {
                Ok(report) => {
                    if report.is_empty() {
                        tracing::warn!(iteration = index, "Response carried no delimited blocks");
                    }
                }
                Err(err @ ExtractError::Unterminated { .. }) => {
                    tracing::warn!(iteration = index, error = %err, "Malformed response rejected");
                    let detail = err.to_string();
                    history.record_failure(&response, format_reminder(&err));
                    fail(&mut records, IterationVerdict::ExtractionRejected, detail);
                    advance(&mut state, RepairState::FailedIteration)?;
                    state = self.next_or_exhaust(state, index, budget)?;
                    continue;
                }
                Err(err @ ExtractError::Write { .. }) => {
                    // Cannot place artifacts on disk: nothing downstream can
                    // run, and retrying will not change the filesystem.
                    return Err(DomainError::ExtractionFailed(err.to_string()));
                }
            }

            // VERIFYING
            advance(&mut state, RepairState::Verifying)?;
            let outcome = match self.runner.verify().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(iteration = index, error = %e, "Toolchain failed to launch");
                    SimOutcome {
                        exit_ok: false,
                        log: format!("failed to launch verification toolchain: {e}"),
                    }
                }
            };

            if outcome.passed(self.runner.pass_marker()) {
                advance(&mut state, RepairState::Succeeded)?;
                tracing::info!(iteration = index, "Verification passed");
                self.emit(RepairEvent::VerificationPassed { index });
                records.push(IterationRecord {
                    index,
                    verdict: IterationVerdict::Passed,
                    detail: "simulation passed".to_string(),
                    completed_at: Utc::now(),
                });

                let design = self.extractor.target_path(ArtifactKind::Design);
                let layout = self.handoff.run(&design, &self.top_module).await;
                self.emit(RepairEvent::LayoutFinished { status: layout.clone() });

                return Ok(RepairReport {
                    run_id,
                    started_at,
                    finished_at: Utc::now(),
                    outcome: RepairOutcome::Fixed {
                        iterations: index,
                        layout,
                    },
                    iterations: records,
                    history_entries: history.len(),
                });
            }

            // FAILED_ITERATION: fold feedback into history and go around.
            tracing::info!(iteration = index, "Verification failed, building feedback");
            let feedback = self.build_feedback(&outcome.log);
            history.record_failure(&response, feedback);
            fail(
                &mut records,
                IterationVerdict::SimulationFailed,
                verdict_detail(&outcome),
            );
            advance(&mut state, RepairState::FailedIteration)?;
            state = self.next_or_exhaust(state, index, budget)?;
        }

        debug_assert_eq!(state, RepairState::Exhausted);
        tracing::warn!(budget, "Budget exhausted without a fix");
        self.emit(RepairEvent::Exhausted { iterations: budget });

        Ok(RepairReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcome: RepairOutcome::Exhausted { iterations: budget },
            iterations: records,
            history_entries: history.len(),
        })
    }

    /// From `FailedIteration`, either re-arm for the next round or settle
    /// into the exhausted terminal state.
    fn next_or_exhaust(
        &self,
        mut state: RepairState,
        index: u32,
        budget: u32,
    ) -> DomainResult<RepairState> {
        if index < budget {
            advance(&mut state, RepairState::Generating)?;
        } else {
            advance(&mut state, RepairState::Exhausted)?;
        }
        Ok(state)
    }

    /// Combine the log tail, the waveform excerpt (or its placeholder), and
    /// the fixed analysis prompt into the next user message.
    fn build_feedback(&self, log: &str) -> String {
        let log_tail = tail_chars(log, self.config.log_tail_chars);
        let wave = match self.sampler.sample(&self.runner.trace_path()) {
            Ok(table) => table.render(),
            Err(e) => {
                tracing::warn!(error = %e, "Waveform unavailable, degrading feedback");
                e.placeholder()
            }
        };
        format!(
            "The simulation failed with these assertions/errors:\n\n{log_tail}\n\n\
             Here is the waveform data leading up to the failure:\n{wave}\n\n\
             Analyze the timing diagram. Did a signal change on the wrong clock edge? \
             Please fix the Verilog code."
        )
    }
}

fn advance(state: &mut RepairState, next: RepairState) -> DomainResult<()> {
    if !state.can_advance_to(next) {
        return Err(DomainError::InvalidStateTransition {
            from: state.to_string(),
            to: next.to_string(),
            reason: "illegal repair loop transition".to_string(),
        });
    }
    tracing::debug!(from = %state, to = %next, "State transition");
    *state = next;
    Ok(())
}

fn verdict_detail(outcome: &SimOutcome) -> String {
    if outcome.exit_ok {
        "zero exit but pass marker missing from log".to_string()
    } else {
        "simulation exited non-zero".to_string()
    }
}

fn format_reminder(err: &ExtractError) -> String {
    format!(
        "Your previous response was malformed: {err}. Re-send the complete output with the \
         Verilog strictly inside /// VERILOG START and /// VERILOG END tags and the cocotb \
         testbench strictly inside /// PYTHON START and /// PYTHON END tags."
    )
}

/// Last `max` characters of `s`, on a character boundary.
fn tail_chars(s: &str, max: usize) -> &str {
    let count = s.chars().count();
    if count <= max {
        return s;
    }
    let skip = count - max;
    let (idx, _) = s.char_indices().nth(skip).unwrap_or((s.len(), ' '));
    &s[idx..]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_chars_short_input_is_unchanged() {
        assert_eq!(tail_chars("short log", 1000), "short log");
    }

    #[test]
    fn tail_chars_takes_final_window() {
        let log = "a".repeat(500) + &"b".repeat(1000);
        assert_eq!(tail_chars(&log, 1000), "b".repeat(1000));
    }

    #[test]
    fn tail_chars_respects_multibyte_boundaries() {
        let log = format!("{}αβγδε", "x".repeat(10));
        let tail = tail_chars(&log, 3);
        assert_eq!(tail, "γδε");
    }

    #[test]
    fn format_reminder_restates_the_contract() {
        let err = ExtractError::Unterminated {
            kind: ArtifactKind::Design,
            start: "/// VERILOG START",
        };
        let msg = format_reminder(&err);
        assert!(msg.contains("/// VERILOG END"));
        assert!(msg.contains("/// PYTHON START"));
    }

    #[test]
    fn verdict_detail_distinguishes_silent_pass() {
        let silent = SimOutcome {
            exit_ok: true,
            log: String::new(),
        };
        assert!(verdict_detail(&silent).contains("pass marker missing"));

        let crashed = SimOutcome {
            exit_ok: false,
            log: String::new(),
        };
        assert!(verdict_detail(&crashed).contains("non-zero"));
    }
}
