//! Generation backend adapters.

pub mod client;
pub mod mock;
pub mod types;

pub use client::OpenAiCompatGenerator;
pub use mock::MockGenerator;
