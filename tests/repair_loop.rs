//! End-to-end repair loop scenarios with a scripted generator and stub
//! toolchain commands.

use std::sync::Arc;

use tempfile::TempDir;

use verifix::domain::models::{
    ArtifactConfig, CommandSpec, IterationVerdict, LayoutConfig, LayoutStatus, RepairConfig,
    RepairOutcome, SimulatorConfig,
};
use verifix::infrastructure::llm::MockGenerator;
use verifix::services::{
    ArtifactExtractor, LayoutHandoff, RepairLoop, VerificationRunner, WaveSampler,
};

/// Response carrying both delimited blocks; `body` lands inside the module.
fn response_with(body: &str) -> String {
    format!(
        "/// VERILOG START\n\
         module my_module(input clk, output reg [1:0] count);\n\
         // {body}\n\
         endmodule\n\
         /// VERILOG END\n\
         /// PYTHON START\n\
         import cocotb\n\
         /// PYTHON END\n"
    )
}

const SAMPLE_VCD: &str = r#"$timescale 1ns $end
$scope module my_module $end
$var wire 1 ! clk $end
$var wire 2 " count $end
$upscope $end
$enddefinitions $end
#0
0!
b00 "
#5
1!
b01 "
#10
0!
"#;

/// Stub simulator: passes iff the extracted design contains `FIXED`.
fn grep_gated_simulator(dir: &TempDir) -> SimulatorConfig {
    SimulatorConfig {
        work_dir: dir.path().display().to_string(),
        clean_command: CommandSpec {
            program: "true".to_string(),
            args: vec![],
        },
        run_command: CommandSpec {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "if grep -q FIXED dut.v 2>/dev/null; then echo 'TESTS=1 PASS=1'; \
                 else echo 'assert count == 2 failed on rising edge' 1>&2; exit 1; fi"
                    .to_string(),
            ],
        },
        pass_marker: "TESTS=1 PASS=1".to_string(),
        trace_file: "dump.vcd".to_string(),
    }
}

/// Layout stub that appends the top module name to handoff.log.
fn recording_layout(dir: &TempDir) -> LayoutConfig {
    LayoutConfig {
        enabled: true,
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            format!("echo {{top}} >> {}/handoff.log", dir.path().display()),
        ],
    }
}

fn build_loop(
    dir: &TempDir,
    generator: Arc<MockGenerator>,
    simulator: SimulatorConfig,
    layout: LayoutConfig,
    budget: u32,
) -> RepairLoop {
    let extractor = ArtifactExtractor::new(dir.path(), ArtifactConfig::default());
    let runner = VerificationRunner::new(simulator);
    let sampler = WaveSampler::new(10);
    let handoff = LayoutHandoff::new(layout);
    let config = RepairConfig {
        max_iterations: budget,
        trace_ticks: 10,
        log_tail_chars: 1000,
    };
    RepairLoop::new(
        generator,
        extractor,
        runner,
        sampler,
        handoff,
        config,
        "my_module",
    )
}

#[tokio::test]
async fn fail_then_pass_uses_two_generations_and_one_handoff() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("dump.vcd"), SAMPLE_VCD).unwrap();

    let generator = Arc::new(MockGenerator::new());
    generator.push_response(response_with("BUGGY: count advances on the wrong edge"));
    generator.push_response(response_with("FIXED: count advances on posedge"));

    let repair = build_loop(
        &dir,
        generator.clone(),
        grep_gated_simulator(&dir),
        recording_layout(&dir),
        5,
    );

    let report = repair.run("build a 2-bit counter").await.unwrap();

    // Exactly two generation calls, then the loop stopped with budget left.
    assert_eq!(generator.call_count(), 2);
    match &report.outcome {
        RepairOutcome::Fixed { iterations, layout } => {
            assert_eq!(*iterations, 2);
            assert_eq!(*layout, LayoutStatus::Completed);
        }
        RepairOutcome::Exhausted { .. } => panic!("expected a fix"),
    }

    // One failed iteration -> exactly one assistant/user entry pair.
    assert_eq!(report.history_entries, 2);
    assert_eq!(generator.seen_history_lens(), vec![0, 2]);

    // The feedback message embeds the log excerpt, the waveform table, and
    // the clock-edge analysis prompt.
    let histories = generator.seen_histories();
    let feedback = &histories[1][1].content;
    assert!(feedback.contains("assert count == 2 failed on rising edge"));
    assert!(feedback.contains("Waveform State Prior to Failure"));
    assert!(feedback.contains("| Time | clk | count |"));
    assert!(feedback.contains("wrong clock edge"));

    // Handoff invoked exactly once, with the top module name.
    let handoff_log = std::fs::read_to_string(dir.path().join("handoff.log")).unwrap();
    assert_eq!(handoff_log, "my_module\n");

    assert_eq!(report.iterations.len(), 2);
    assert_eq!(report.iterations[0].verdict, IterationVerdict::SimulationFailed);
    assert_eq!(report.iterations[1].verdict, IterationVerdict::Passed);
}

#[tokio::test]
async fn missing_trace_degrades_feedback_without_aborting() {
    let dir = tempfile::tempdir().unwrap();
    // No dump.vcd is ever written.

    let generator = Arc::new(MockGenerator::new());
    generator.push_response(response_with("BUGGY"));
    generator.push_response(response_with("FIXED"));

    let repair = build_loop(
        &dir,
        generator.clone(),
        grep_gated_simulator(&dir),
        recording_layout(&dir),
        5,
    );

    let report = repair.run("build a 2-bit counter").await.unwrap();
    assert!(report.outcome.is_fixed());

    let histories = generator.seen_histories();
    let feedback = &histories[1][1].content;
    assert!(feedback.contains("[Waveform dump not found. Ensure WAVES=1 is set.]"));
}

#[tokio::test]
async fn generator_error_spends_iteration_without_history_entries() {
    let dir = tempfile::tempdir().unwrap();

    let generator = Arc::new(MockGenerator::new());
    generator.push_error("connection refused");
    generator.push_response(response_with("FIXED"));

    let repair = build_loop(
        &dir,
        generator.clone(),
        grep_gated_simulator(&dir),
        recording_layout(&dir),
        5,
    );

    let report = repair.run("build a 2-bit counter").await.unwrap();

    match &report.outcome {
        RepairOutcome::Fixed { iterations, .. } => assert_eq!(*iterations, 2),
        RepairOutcome::Exhausted { .. } => panic!("expected a fix on iteration 2"),
    }
    assert_eq!(report.iterations[0].verdict, IterationVerdict::GenerationFailed);

    // The dead call left no trace in history: both calls saw it empty.
    assert_eq!(report.history_entries, 0);
    assert_eq!(generator.seen_history_lens(), vec![0, 0]);
}

#[tokio::test]
async fn budget_exhaustion_is_a_normal_outcome() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("dump.vcd"), SAMPLE_VCD).unwrap();

    let generator = Arc::new(MockGenerator::with_default_response(response_with("BUGGY")));

    let repair = build_loop(
        &dir,
        generator.clone(),
        grep_gated_simulator(&dir),
        recording_layout(&dir),
        2,
    );

    let report = repair.run("build a 2-bit counter").await.unwrap();

    match &report.outcome {
        RepairOutcome::Exhausted { iterations } => assert_eq!(*iterations, 2),
        RepairOutcome::Fixed { .. } => panic!("stub simulator can never pass"),
    }
    assert_eq!(generator.call_count(), 2);
    // Two failed iterations -> two entry pairs.
    assert_eq!(report.history_entries, 4);
    assert_eq!(generator.seen_history_lens(), vec![0, 2]);
    // No handoff after exhaustion.
    assert!(!dir.path().join("handoff.log").exists());
}

#[tokio::test]
async fn unterminated_block_marks_iteration_failed_with_format_reminder() {
    let dir = tempfile::tempdir().unwrap();

    let generator = Arc::new(MockGenerator::new());
    generator.push_response("/// VERILOG START\nmodule my_module; endmodule\n".to_string());
    generator.push_response(response_with("FIXED"));

    let repair = build_loop(
        &dir,
        generator.clone(),
        grep_gated_simulator(&dir),
        recording_layout(&dir),
        5,
    );

    let report = repair.run("build a 2-bit counter").await.unwrap();

    assert!(report.outcome.is_fixed());
    assert_eq!(
        report.iterations[0].verdict,
        IterationVerdict::ExtractionRejected
    );
    // The malformed response and the reminder both entered history.
    assert_eq!(generator.seen_history_lens(), vec![0, 2]);
    let histories = generator.seen_histories();
    let reminder = &histories[1][1].content;
    assert!(reminder.contains("/// VERILOG END"));
    // No simulation ran for the rejected response, so no partial artifact.
    assert!(!dir.path().join("dut.v").exists() || {
        let content = std::fs::read_to_string(dir.path().join("dut.v")).unwrap();
        content.contains("FIXED")
    });
}

#[tokio::test]
async fn layout_failure_is_reported_without_reopening_the_loop() {
    let dir = tempfile::tempdir().unwrap();

    let generator = Arc::new(MockGenerator::new());
    generator.push_response(response_with("FIXED"));

    let layout = LayoutConfig {
        enabled: true,
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "echo synthesis blew up 1>&2; exit 1".to_string()],
    };

    let repair = build_loop(
        &dir,
        generator.clone(),
        grep_gated_simulator(&dir),
        layout,
        5,
    );

    let report = repair.run("build a 2-bit counter").await.unwrap();

    match &report.outcome {
        RepairOutcome::Fixed { iterations, layout } => {
            assert_eq!(*iterations, 1);
            assert!(matches!(layout, LayoutStatus::Failed { reason } if reason.contains("synthesis blew up")));
        }
        RepairOutcome::Exhausted { .. } => panic!("expected a fix"),
    }
    // The failed handoff did not trigger more generation calls.
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn silent_pass_without_marker_counts_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("dump.vcd"), SAMPLE_VCD).unwrap();

    let generator = Arc::new(MockGenerator::with_default_response(response_with("BUGGY")));

    // Exits zero but never prints the marker.
    let simulator = SimulatorConfig {
        work_dir: dir.path().display().to_string(),
        clean_command: CommandSpec {
            program: "true".to_string(),
            args: vec![],
        },
        run_command: CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo compiled, ran nothing".to_string()],
        },
        pass_marker: "TESTS=1 PASS=1".to_string(),
        trace_file: "dump.vcd".to_string(),
    };

    let repair = build_loop(&dir, generator.clone(), simulator, recording_layout(&dir), 2);
    let report = repair.run("build a 2-bit counter").await.unwrap();

    assert!(matches!(report.outcome, RepairOutcome::Exhausted { .. }));
    assert!(!dir.path().join("handoff.log").exists());
}
