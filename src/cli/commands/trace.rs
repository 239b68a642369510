//! Implementation of the `verifix trace` command.
//!
//! Dumps the same trailing-window excerpt the repair loop would feed back,
//! for inspecting a waveform by hand.

use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::services::WaveSampler;

#[derive(Args, Debug)]
pub struct TraceArgs {
    /// VCD file to sample
    pub file: PathBuf,

    /// Trailing clock ticks to show
    #[arg(long, default_value_t = 10)]
    pub ticks: u64,
}

#[derive(Debug, Serialize)]
struct TraceOutput {
    file: PathBuf,
    excerpt: String,
}

impl CommandOutput for TraceOutput {
    fn to_human(&self) -> String {
        self.excerpt.clone()
    }
}

pub async fn execute(args: TraceArgs, json_mode: bool) -> Result<()> {
    let sampler = WaveSampler::new(args.ticks);
    let table = sampler
        .sample(&args.file)
        .map_err(|e| anyhow!("{}: {e}", args.file.display()))?;

    output(
        &TraceOutput {
            file: args.file,
            excerpt: table.render(),
        },
        json_mode,
    );
    Ok(())
}
