//! Mock generator for tests and dry runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::domain::models::Turn;
use crate::domain::ports::{Generator, GeneratorError};

/// One scripted backend reply: a response text or an error message.
type Scripted = Result<String, String>;

/// Scripted generator: replies are popped in order, falling back to a
/// default response (if configured) once the script runs dry. Every call's
/// history length is recorded for assertions.
pub struct MockGenerator {
    script: Mutex<VecDeque<Scripted>>,
    default_response: Option<String>,
    seen_histories: Mutex<Vec<Vec<Turn>>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_response: None,
            seen_histories: Mutex::new(Vec::new()),
        }
    }

    /// A generator that always replies with `response`.
    pub fn with_default_response(response: impl Into<String>) -> Self {
        Self {
            default_response: Some(response.into()),
            ..Self::new()
        }
    }

    /// Queue a successful reply.
    pub fn push_response(&self, response: impl Into<String>) {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(Ok(response.into()));
    }

    /// Queue a failed call.
    pub fn push_error(&self, message: impl Into<String>) {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(Err(message.into()));
    }

    /// Number of `generate` calls made so far.
    pub fn call_count(&self) -> usize {
        self.seen_histories.lock().expect("mock call lock").len()
    }

    /// History length observed at each call, in order.
    pub fn seen_history_lens(&self) -> Vec<usize> {
        self.seen_histories
            .lock()
            .expect("mock call lock")
            .iter()
            .map(Vec::len)
            .collect()
    }

    /// Full history snapshot observed at each call, in order.
    pub fn seen_histories(&self) -> Vec<Vec<Turn>> {
        self.seen_histories.lock().expect("mock call lock").clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, history: &[Turn], _request: &str) -> Result<String, GeneratorError> {
        self.seen_histories
            .lock()
            .expect("mock call lock")
            .push(history.to_vec());

        let scripted = self.script.lock().expect("mock script lock").pop_front();
        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(GeneratorError::Unreachable(message)),
            None => self
                .default_response
                .clone()
                .ok_or_else(|| GeneratorError::Unreachable("mock script exhausted".to_string())),
        }
    }
}
