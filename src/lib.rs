//! Verifix - LLM-driven Verilog repair loop
//!
//! Verifix turns a natural-language hardware specification into a verified
//! Verilog design by looping a code-generation backend against a simulation
//! toolchain: generate design + testbench, simulate, and on failure feed a
//! log excerpt plus a condensed waveform table back to the backend. The
//! first passing run triggers a one-shot physical-design handoff.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure models (configuration, conversation
//!   history, artifact kinds, reports) and ports (the generation backend)
//! - **Service Layer** (`services`): The repair loop and its collaborators
//!   (trace sampler, artifact extractor, verification runner, layout handoff)
//! - **Infrastructure Layer** (`infrastructure`): External integrations
//!   (config loading, the HTTP generation client, the mock generator)
//! - **CLI Layer** (`cli`): Command-line interface

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    ArtifactKind, Config, Conversation, IterationVerdict, LayoutStatus, RepairOutcome,
    RepairReport, RepairState, Role, Turn,
};
pub use domain::ports::{Generator, GeneratorError};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::{ConfigError, ConfigLoader};
pub use services::{
    ArtifactExtractor, LayoutHandoff, RepairEvent, RepairLoop, VerificationRunner, WaveSampler,
};
