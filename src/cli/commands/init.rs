//! Implementation of the `verifix init` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_path: PathBuf,
    pub spec_stub_created: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.success {
            lines.push(format!("Config written to {}", self.config_path.display()));
        }
        if self.spec_stub_created {
            lines.push("Wrote design_spec.txt stub -- fill in your hardware spec.".to_string());
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let verifix_dir = target.join(".verifix");
    let config_path = verifix_dir.join("config.yaml");

    if config_path.exists() && !args.force {
        output(
            &InitOutput {
                success: false,
                message: "Project already initialized. Use --force to reinitialize.".to_string(),
                config_path,
                spec_stub_created: false,
            },
            json_mode,
        );
        return Ok(());
    }

    fs::create_dir_all(&verifix_dir)
        .await
        .with_context(|| format!("Failed to create {}", verifix_dir.display()))?;

    let yaml = serde_yaml::to_string(&Config::default())
        .context("Failed to serialize default configuration")?;
    fs::write(&config_path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let spec_path = target.join("design_spec.txt");
    let spec_stub_created = if spec_path.exists() {
        false
    } else {
        fs::write(&spec_path, "Design a 2-bit counter with synchronous reset.\n")
            .await
            .with_context(|| format!("Failed to write {}", spec_path.display()))?;
        true
    };

    output(
        &InitOutput {
            success: true,
            message: if args.force {
                "Project reinitialized successfully.".to_string()
            } else {
                "Project initialized successfully.".to_string()
            },
            config_path,
            spec_stub_created,
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_writes_loadable_config_and_spec_stub() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            force: false,
            path: dir.path().to_path_buf(),
        };

        execute(args, true).await.unwrap();

        let config_path = dir.path().join(".verifix/config.yaml");
        assert!(config_path.exists());
        let config = crate::infrastructure::ConfigLoader::load_from_file(&config_path).unwrap();
        assert_eq!(config.repair.max_iterations, 5);
        assert!(dir.path().join("design_spec.txt").exists());
    }

    #[tokio::test]
    async fn reinit_requires_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();

        execute(InitArgs { force: false, path: path.clone() }, true)
            .await
            .unwrap();
        std::fs::write(dir.path().join(".verifix/config.yaml"), "repair:\n  max_iterations: 2\n")
            .unwrap();

        // Without --force the existing config survives.
        execute(InitArgs { force: false, path: path.clone() }, true)
            .await
            .unwrap();
        let kept = std::fs::read_to_string(dir.path().join(".verifix/config.yaml")).unwrap();
        assert!(kept.contains("max_iterations: 2"));

        // With --force it is rewritten.
        execute(InitArgs { force: true, path }, true).await.unwrap();
        let rewritten =
            std::fs::read_to_string(dir.path().join(".verifix/config.yaml")).unwrap();
        assert!(rewritten.contains("max_iterations: 5"));
    }
}
