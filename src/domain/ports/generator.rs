//! Generation backend port.
//!
//! Abstracts the code-generation service behind a request/response text
//! interface so the repair loop can run against an HTTP backend in
//! production and a scripted mock in tests. The client is constructed once
//! at startup and passed by reference to the orchestrator; there is no
//! process-wide singleton.

use async_trait::async_trait;

use crate::domain::models::Turn;

/// Error types for generation backend calls.
///
/// A failed call is fatal for the current iteration only. Retry is the
/// repair loop's job, not this layer's, so no variant here carries retry
/// semantics.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Backend returned error status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Backend returned no completion choices")]
    EmptyResponse,
}

/// Port trait for code generation backends.
///
/// Implementations receive the accumulated conversation history plus the
/// current request, and must prepend their own fixed system instruction set
/// (the delimiter and top-module contract). They return the raw response
/// text; extracting the tagged blocks from it is the extractor's concern.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Identifier for logging (e.g. "openai-compat", "mock").
    fn name(&self) -> &str;

    /// Send `history` + a new user `request` and return the response text.
    async fn generate(&self, history: &[Turn], request: &str) -> Result<String, GeneratorError>;
}
