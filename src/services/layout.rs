//! Physical-design handoff.
//!
//! Invoked exactly once, after the first verified success, with the design
//! artifact path and the top-level module name. The pipeline itself is
//! opaque: one external command, awaited to completion. Its failure is
//! reported but never reopens the repair loop.

use std::path::Path;

use tokio::process::Command;

use crate::domain::models::{LayoutConfig, LayoutStatus};

/// Runs the one-shot downstream layout pipeline.
#[derive(Debug, Clone)]
pub struct LayoutHandoff {
    config: LayoutConfig,
}

impl LayoutHandoff {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Substitute `{source}` / `{top}` placeholders into the configured args.
    fn resolve_args(&self, source: &Path, top_module: &str) -> Vec<String> {
        self.config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{source}", &source.display().to_string())
                    .replace("{top}", top_module)
            })
            .collect()
    }

    /// Run the pipeline over the verified design artifact.
    pub async fn run(&self, source: &Path, top_module: &str) -> LayoutStatus {
        if !self.config.enabled {
            tracing::info!("Layout handoff disabled by configuration");
            return LayoutStatus::Disabled;
        }

        let args = self.resolve_args(source, top_module);
        tracing::info!(
            program = %self.config.program,
            args = ?args,
            "Starting physical-design flow"
        );

        let result = Command::new(&self.config.program)
            .args(&args)
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => {
                tracing::info!("Physical-design flow complete");
                LayoutStatus::Completed
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let reason = format!(
                    "pipeline exited with status {:?}: {}",
                    output.status.code(),
                    stderr.trim()
                );
                tracing::error!(reason = %reason, "Physical-design flow failed");
                LayoutStatus::Failed { reason }
            }
            Err(e) => {
                let reason = format!("failed to spawn {}: {e}", self.config.program);
                tracing::error!(reason = %reason, "Physical-design flow failed");
                LayoutStatus::Failed { reason }
            }
        }
    }
}
