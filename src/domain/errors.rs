//! Domain errors for the verifix repair loop.

use thiserror::Error;

/// Domain-level errors that can occur during a repair run.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Specification file not found: {0}")]
    SpecMissing(String),

    #[error("Specification file is empty: {0}")]
    SpecEmpty(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Simulation failed to launch: {0}")]
    SimulationFailed(String),

    #[error("Layout handoff failed: {0}")]
    LayoutFailed(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Process exit code for fatal errors.
    ///
    /// Missing and empty specification inputs get distinct codes so callers
    /// can tell them apart without parsing messages. Everything else maps to
    /// the generic failure code.
    pub fn exit_code(&self) -> i32 {
        match self {
            DomainError::SpecMissing(_) => 2,
            DomainError::SpecEmpty(_) => 3,
            _ => 1,
        }
    }
}
