//! Verification runner.
//!
//! Drives the external build+simulate toolchain as a clean-then-run pair of
//! blocking process invocations. The cleanup step is best-effort and its
//! failure is suppressed; the run step's exit status is the authoritative
//! pass/fail signal, combined with a pass-marker check on the captured log.

use std::path::PathBuf;

use tokio::process::Command;

use crate::domain::models::{CommandSpec, SimulatorConfig};

/// Outcome of one build+simulate invocation.
#[derive(Debug, Clone)]
pub struct SimOutcome {
    /// Whether the run command exited with status zero.
    pub exit_ok: bool,
    /// Combined stdout and stderr of the run command.
    pub log: String,
}

impl SimOutcome {
    /// Strict success criterion: zero exit AND the pass marker present in
    /// the log. A clean exit with no marker is a silent no-op test run and
    /// counts as a failure.
    pub fn passed(&self, pass_marker: &str) -> bool {
        self.exit_ok && self.log.contains(pass_marker)
    }
}

/// Runs the simulation toolchain in a working directory.
#[derive(Debug, Clone)]
pub struct VerificationRunner {
    work_dir: PathBuf,
    config: SimulatorConfig,
}

impl VerificationRunner {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            work_dir: PathBuf::from(&config.work_dir),
            config,
        }
    }

    /// Path of the waveform dump the run is expected to produce.
    pub fn trace_path(&self) -> PathBuf {
        self.work_dir.join(&self.config.trace_file)
    }

    /// The configured pass-marker substring.
    pub fn pass_marker(&self) -> &str {
        &self.config.pass_marker
    }

    /// Clean, then build and simulate. Returns the run outcome, or an error
    /// only when the run command itself cannot be spawned.
    pub async fn verify(&self) -> std::io::Result<SimOutcome> {
        self.clean_best_effort().await;

        let run = &self.config.run_command;
        tracing::info!(
            program = %run.program,
            args = ?run.args,
            work_dir = %self.work_dir.display(),
            "Running build+simulate"
        );

        let output = Command::new(&run.program)
            .args(&run.args)
            .current_dir(&self.work_dir)
            .output()
            .await?;

        let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
        log.push_str(&String::from_utf8_lossy(&output.stderr));

        let exit_ok = output.status.success();
        tracing::info!(exit_ok, log_bytes = log.len(), "Simulation complete");

        Ok(SimOutcome { exit_ok, log })
    }

    /// Run the cleanup command, ignoring both spawn failures and non-zero
    /// exits. Cleanup is not a result.
    async fn clean_best_effort(&self) {
        let clean = &self.config.clean_command;
        match Command::new(&clean.program)
            .args(&clean.args)
            .current_dir(&self.work_dir)
            .output()
            .await
        {
            Ok(output) if !output.status.success() => {
                tracing::debug!(
                    program = %clean.program,
                    status = ?output.status.code(),
                    "Cleanup exited non-zero (ignored)"
                );
            }
            Err(e) => {
                tracing::debug!(program = %clean.program, error = %e, "Cleanup failed to spawn (ignored)");
            }
            Ok(_) => {}
        }
    }
}

/// Build a [`SimulatorConfig`] whose clean/run commands are arbitrary
/// executables, for wiring stub toolchains in tests.
pub fn simulator_config_with(
    work_dir: &str,
    clean: CommandSpec,
    run: CommandSpec,
    pass_marker: &str,
) -> SimulatorConfig {
    SimulatorConfig {
        work_dir: work_dir.to_string(),
        clean_command: clean,
        run_command: run,
        pass_marker: pass_marker.to_string(),
        ..SimulatorConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    #[test]
    fn pass_requires_marker_and_zero_exit() {
        let passing = SimOutcome {
            exit_ok: true,
            log: "ok TESTS=1 PASS=1 done".to_string(),
        };
        assert!(passing.passed("TESTS=1 PASS=1"));

        let silent = SimOutcome {
            exit_ok: true,
            log: "compiled fine, ran nothing".to_string(),
        };
        assert!(!silent.passed("TESTS=1 PASS=1"));

        let crashed = SimOutcome {
            exit_ok: false,
            log: "TESTS=1 PASS=1 but exited 2".to_string(),
        };
        assert!(!crashed.passed("TESTS=1 PASS=1"));
    }

    #[tokio::test]
    async fn captures_combined_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = simulator_config_with(
            dir.path().to_str().unwrap(),
            sh("true"),
            sh("echo to-stdout; echo to-stderr 1>&2"),
            "TESTS=1 PASS=1",
        );

        let outcome = VerificationRunner::new(config).verify().await.unwrap();
        assert!(outcome.exit_ok);
        assert!(outcome.log.contains("to-stdout"));
        assert!(outcome.log.contains("to-stderr"));
    }

    #[tokio::test]
    async fn cleanup_failure_is_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let config = simulator_config_with(
            dir.path().to_str().unwrap(),
            CommandSpec {
                program: "/nonexistent/cleaner".to_string(),
                args: vec![],
            },
            sh("echo TESTS=1 PASS=1"),
            "TESTS=1 PASS=1",
        );

        let runner = VerificationRunner::new(config);
        let outcome = runner.verify().await.unwrap();
        assert!(outcome.passed(runner.pass_marker()));
    }

    #[tokio::test]
    async fn failing_run_reports_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let config = simulator_config_with(
            dir.path().to_str().unwrap(),
            sh("true"),
            sh("echo assertion error 1>&2; exit 1"),
            "TESTS=1 PASS=1",
        );

        let outcome = VerificationRunner::new(config).verify().await.unwrap();
        assert!(!outcome.exit_ok);
        assert!(outcome.log.contains("assertion error"));
    }
}
