//! Command-line interface.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::domain::DomainError;

#[derive(Parser, Debug)]
#[command(
    name = "verifix",
    version,
    about = "LLM-driven Verilog repair loop with waveform feedback and silicon handoff"
)]
pub struct Cli {
    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the repair loop against a design specification
    Run(commands::run::RunArgs),
    /// Initialize a project: config file and spec stub
    Init(commands::init::InitArgs),
    /// Print the trailing-window excerpt of a waveform dump
    Trace(commands::trace::TraceArgs),
}

/// Print a fatal error and exit with its mapped code.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    let code = err
        .downcast_ref::<DomainError>()
        .map_or(1, DomainError::exit_code);

    if json_mode {
        let payload = serde_json::json!({
            "error": err.to_string(),
            "exit_code": code,
        });
        eprintln!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
    } else {
        eprintln!("{} {:#}", console::style("[FAIL]").red().bold(), err);
    }

    std::process::exit(code)
}
