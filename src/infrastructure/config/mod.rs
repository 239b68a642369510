//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_iterations: {0}. Must be between 1 and 100")]
    InvalidMaxIterations(u32),

    #[error("Invalid trace_ticks: {0}. Must be at least 1")]
    InvalidTraceTicks(u64),

    #[error("Invalid log_tail_chars: {0}. Must be at least 1")]
    InvalidLogTail(usize),

    #[error("Generator base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("Generator model cannot be empty")]
    EmptyModel,

    #[error("Invalid temperature: {0}. Must be within 0.0..=2.0")]
    InvalidTemperature(f32),

    #[error("Simulator {0} command program cannot be empty")]
    EmptyCommand(&'static str),

    #[error("Pass marker cannot be empty")]
    EmptyPassMarker,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Top module name cannot be empty")]
    EmptyTopModule,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .verifix/config.yaml (project config, created by init)
    /// 3. .verifix/local.yaml (project local overrides, optional)
    /// 4. Environment variables (VERIFIX_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".verifix/config.yaml"))
            .merge(Yaml::file(".verifix/local.yaml"))
            .merge(Env::prefixed("VERIFIX_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.repair.max_iterations == 0 || config.repair.max_iterations > 100 {
            return Err(ConfigError::InvalidMaxIterations(
                config.repair.max_iterations,
            ));
        }

        if config.repair.trace_ticks == 0 {
            return Err(ConfigError::InvalidTraceTicks(config.repair.trace_ticks));
        }

        if config.repair.log_tail_chars == 0 {
            return Err(ConfigError::InvalidLogTail(config.repair.log_tail_chars));
        }

        if config.generator.base_url.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }

        if config.generator.model.is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        if !(0.0..=2.0).contains(&config.generator.temperature) {
            return Err(ConfigError::InvalidTemperature(config.generator.temperature));
        }

        if config.simulator.clean_command.program.is_empty() {
            return Err(ConfigError::EmptyCommand("clean"));
        }

        if config.simulator.run_command.program.is_empty() {
            return Err(ConfigError::EmptyCommand("run"));
        }

        if config.simulator.pass_marker.is_empty() {
            return Err(ConfigError::EmptyPassMarker);
        }

        if config.artifacts.top_module.is_empty() {
            return Err(ConfigError::EmptyTopModule);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}
