use serde::{Deserialize, Serialize};

/// Main configuration structure for verifix
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Path to the design specification file
    #[serde(default = "default_spec_file")]
    pub spec_file: String,

    /// Repair loop configuration
    #[serde(default)]
    pub repair: RepairConfig,

    /// Code generation backend configuration
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Simulation toolchain configuration
    #[serde(default)]
    pub simulator: SimulatorConfig,

    /// Generated artifact configuration
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Physical-design handoff configuration
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_spec_file() -> String {
    "design_spec.txt".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spec_file: default_spec_file(),
            repair: RepairConfig::default(),
            generator: GeneratorConfig::default(),
            simulator: SimulatorConfig::default(),
            artifacts: ArtifactConfig::default(),
            layout: LayoutConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Repair loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RepairConfig {
    /// Maximum generate/verify iterations before giving up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Trailing clock ticks shown in the waveform feedback table
    #[serde(default = "default_trace_ticks")]
    pub trace_ticks: u64,

    /// Characters of simulation log kept in the feedback message
    #[serde(default = "default_log_tail_chars")]
    pub log_tail_chars: usize,
}

const fn default_max_iterations() -> u32 {
    5
}

const fn default_trace_ticks() -> u64 {
    10
}

const fn default_log_tail_chars() -> usize {
    1000
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            trace_ticks: default_trace_ticks(),
            log_tail_chars: default_log_tail_chars(),
        }
    }
}

/// Code generation backend configuration
///
/// Targets any OpenAI-compatible chat completions endpoint. The default
/// points at a local Ollama instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GeneratorConfig {
    /// Base URL of the chat completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// API key (can also be set via VERIFIX_GENERATOR__API_KEY)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Sampling temperature. Kept low so repair attempts converge instead
    /// of wandering.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_model() -> String {
    "qwen2.5-coder:7b".to_string()
}

const fn default_temperature() -> f32 {
    0.1
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_timeout_secs() -> u64 {
    300
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Simulation toolchain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SimulatorConfig {
    /// Working directory for the toolchain invocations
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Cleanup command, run best-effort before every simulation
    #[serde(default = "default_clean_command")]
    pub clean_command: CommandSpec,

    /// Build+simulate command; its exit status is the authoritative signal
    #[serde(default = "default_run_command")]
    pub run_command: CommandSpec,

    /// Substring that must appear in the log for a run to count as passing
    #[serde(default = "default_pass_marker")]
    pub pass_marker: String,

    /// Waveform dump produced by the simulation, relative to work_dir
    #[serde(default = "default_trace_file")]
    pub trace_file: String,
}

fn default_work_dir() -> String {
    ".".to_string()
}

fn default_clean_command() -> CommandSpec {
    CommandSpec {
        program: "make".to_string(),
        args: vec!["clean".to_string()],
    }
}

fn default_run_command() -> CommandSpec {
    CommandSpec {
        program: "make".to_string(),
        args: vec!["WAVES=1".to_string()],
    }
}

fn default_pass_marker() -> String {
    "TESTS=1 PASS=1".to_string()
}

fn default_trace_file() -> String {
    "dump.vcd".to_string()
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            clean_command: default_clean_command(),
            run_command: default_run_command(),
            pass_marker: default_pass_marker(),
            trace_file: default_trace_file(),
        }
    }
}

/// An external program invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CommandSpec {
    /// Program to execute
    pub program: String,

    /// Arguments to pass
    #[serde(default)]
    pub args: Vec<String>,
}

/// Generated artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ArtifactConfig {
    /// Target file for the hardware description, relative to work_dir
    #[serde(default = "default_design_file")]
    pub design_file: String,

    /// Target file for the testbench, relative to work_dir
    #[serde(default = "default_testbench_file")]
    pub testbench_file: String,

    /// Required name of the generated top-level module
    #[serde(default = "default_top_module")]
    pub top_module: String,
}

fn default_design_file() -> String {
    "dut.v".to_string()
}

fn default_testbench_file() -> String {
    "testbench.py".to_string()
}

fn default_top_module() -> String {
    "my_module".to_string()
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            design_file: default_design_file(),
            testbench_file: default_testbench_file(),
            top_module: default_top_module(),
        }
    }
}

/// Physical-design handoff configuration
///
/// The handoff is an opaque one-shot external pipeline. `{source}` and
/// `{top}` placeholders in the args are substituted with the verified design
/// file and the top module name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LayoutConfig {
    /// Whether to invoke the handoff after verified success
    #[serde(default = "default_layout_enabled")]
    pub enabled: bool,

    /// Pipeline program to execute
    #[serde(default = "default_layout_program")]
    pub program: String,

    /// Pipeline arguments, with `{source}` / `{top}` placeholders
    #[serde(default = "default_layout_args")]
    pub args: Vec<String>,
}

const fn default_layout_enabled() -> bool {
    true
}

fn default_layout_program() -> String {
    "sc".to_string()
}

fn default_layout_args() -> Vec<String> {
    vec![
        "{source}".to_string(),
        "-design".to_string(),
        "{top}".to_string(),
        "-target".to_string(),
        "asap7_demo".to_string(),
    ]
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            enabled: default_layout_enabled(),
            program: default_layout_program(),
            args: default_layout_args(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
