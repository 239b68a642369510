//! Implementation of the `verifix run` command.

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{presets, Cell, ContentArrangement, Table};
use console::style;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{LayoutStatus, RepairOutcome, RepairReport};
use crate::domain::ports::Generator;
use crate::domain::DomainError;
use crate::infrastructure::llm::{MockGenerator, OpenAiCompatGenerator};
use crate::infrastructure::ConfigLoader;
use crate::services::{
    ArtifactExtractor, LayoutHandoff, RepairEvent, RepairLoop, VerificationRunner, WaveSampler,
};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Design specification file (overrides configuration)
    #[arg(long)]
    pub spec: Option<PathBuf>,

    /// Maximum repair iterations (overrides configuration)
    #[arg(long)]
    pub budget: Option<u32>,

    /// Model identifier (overrides configuration)
    #[arg(long)]
    pub model: Option<String>,

    /// Use a canned offline generator instead of the HTTP backend
    #[arg(long)]
    pub dry_run: bool,
}

/// Canned response used by `--dry-run` so the whole pipeline can be
/// exercised without a live backend.
const DRY_RUN_RESPONSE: &str = "/// VERILOG START\n\
module my_module(input clk, input rst, output reg [1:0] count);\n\
  always @(posedge clk) begin\n\
    if (rst) count <= 2'b00;\n\
    else count <= count + 1;\n\
  end\n\
endmodule\n\
/// VERILOG END\n\
/// PYTHON START\n\
import cocotb\n\
from cocotb.triggers import RisingEdge\n\
\n\
@cocotb.test()\n\
async def counter_increments(dut):\n\
    pass\n\
/// PYTHON END\n";

#[derive(Debug, Serialize)]
struct RunOutput {
    #[serde(flatten)]
    report: RepairReport,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Iteration", "Verdict", "Detail"]);
        for record in &self.report.iterations {
            table.add_row(vec![
                Cell::new(record.index),
                Cell::new(record.verdict.to_string()),
                Cell::new(&record.detail),
            ]);
        }

        let outcome = match &self.report.outcome {
            RepairOutcome::Fixed { iterations, layout } => {
                let layout_line = match layout {
                    LayoutStatus::Completed => "layout complete".to_string(),
                    LayoutStatus::Failed { reason } => format!("layout failed: {reason}"),
                    LayoutStatus::Disabled => "layout disabled".to_string(),
                };
                format!("Fixed after {iterations} iteration(s); {layout_line}")
            }
            RepairOutcome::Exhausted { iterations } => {
                format!("No fix found within {iterations} iteration(s)")
            }
        };

        format!(
            "{table}\n\nRun {}: {} ({} history entries)",
            self.report.run_id, outcome, self.report.history_entries
        )
    }
}

pub async fn execute(args: RunArgs, json_mode: bool) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    if let Some(spec) = &args.spec {
        config.spec_file = spec.display().to_string();
    }
    if let Some(budget) = args.budget {
        config.repair.max_iterations = budget;
    }
    if let Some(model) = args.model {
        config.generator.model = model;
    }
    ConfigLoader::validate(&config).map_err(|e| DomainError::ValidationFailed(e.to_string()))?;

    let spec = read_spec(Path::new(&config.spec_file))?;

    if !json_mode {
        println!("{}", style("Verifix Hardware Repair Agent").bold());
        println!(
            "Loaded specification from {} ({} characters)",
            config.spec_file,
            spec.len()
        );
    }

    let generator: Arc<dyn Generator> = if args.dry_run {
        Arc::new(MockGenerator::with_default_response(DRY_RUN_RESPONSE))
    } else {
        Arc::new(OpenAiCompatGenerator::new(
            config.generator.clone(),
            &config.artifacts.top_module,
        )?)
    };

    let extractor = ArtifactExtractor::new(&config.simulator.work_dir, config.artifacts.clone());
    let runner = VerificationRunner::new(config.simulator.clone());
    let sampler = WaveSampler::new(config.repair.trace_ticks);
    let handoff = LayoutHandoff::new(config.layout.clone());

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let printer = if json_mode {
        None
    } else {
        Some(tokio::spawn(print_events(event_rx)))
    };

    let repair = RepairLoop::new(
        generator,
        extractor,
        runner,
        sampler,
        handoff,
        config.repair.clone(),
        config.artifacts.top_module.clone(),
    )
    .with_events(event_tx);

    let report = repair.run(&spec).await?;

    // Drop the loop (and with it the event sender) so the printer drains
    // the channel and exits.
    drop(repair);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    output(&RunOutput { report }, json_mode);
    Ok(())
}

/// Load the specification, distinguishing missing from empty input.
fn read_spec(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(DomainError::SpecMissing(path.display().to_string()).into());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let spec = raw.trim().to_string();
    if spec.is_empty() {
        return Err(DomainError::SpecEmpty(path.display().to_string()).into());
    }
    Ok(spec)
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<RepairEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            RepairEvent::Started { budget } => {
                println!("Budget: {budget} iteration(s)");
            }
            RepairEvent::IterationStarted { index } => {
                println!("\n{}", style(format!("--- Iteration {index} ---")).bold());
                println!("Agent is reading the spec and writing code...");
            }
            RepairEvent::IterationFailed { verdict, .. } => {
                println!(
                    "{} {verdict}; extracting waveforms and feeding back to agent",
                    style("[FAIL]").red().bold()
                );
            }
            RepairEvent::VerificationPassed { index } => {
                println!(
                    "{} Simulation passed on iteration {index}",
                    style("[PASS]").green().bold()
                );
            }
            RepairEvent::LayoutFinished { status } => match status {
                LayoutStatus::Completed => {
                    println!("{} Physical-design flow complete", style("[PASS]").green());
                }
                LayoutStatus::Failed { reason } => {
                    println!(
                        "{} Physical-design flow failed: {reason}",
                        style("[FAIL]").red()
                    );
                }
                LayoutStatus::Disabled => {
                    println!("Physical-design handoff disabled; skipping");
                }
            },
            RepairEvent::Exhausted { iterations } => {
                println!(
                    "\n{} Reached {iterations} iteration(s) without a fix.",
                    style("[STOP]").yellow().bold()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_spec_missing_maps_to_domain_error() {
        let err = read_spec(Path::new("/nonexistent/design_spec.txt")).unwrap_err();
        let domain = err.downcast_ref::<DomainError>().unwrap();
        assert!(matches!(domain, DomainError::SpecMissing(_)));
        assert_eq!(domain.exit_code(), 2);
    }

    #[test]
    fn read_spec_empty_maps_to_domain_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("design_spec.txt");
        std::fs::write(&path, "  \n\t\n").unwrap();

        let err = read_spec(&path).unwrap_err();
        let domain = err.downcast_ref::<DomainError>().unwrap();
        assert!(matches!(domain, DomainError::SpecEmpty(_)));
        assert_eq!(domain.exit_code(), 3);
    }

    #[test]
    fn read_spec_trims_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("design_spec.txt");
        std::fs::write(&path, "\nbuild a 2-bit counter\n").unwrap();
        assert_eq!(read_spec(&path).unwrap(), "build a 2-bit counter");
    }

    #[test]
    fn dry_run_response_carries_both_blocks() {
        assert!(DRY_RUN_RESPONSE.contains("/// VERILOG START"));
        assert!(DRY_RUN_RESPONSE.contains("/// VERILOG END"));
        assert!(DRY_RUN_RESPONSE.contains("/// PYTHON START"));
        assert!(DRY_RUN_RESPONSE.contains("/// PYTHON END"));
    }
}
