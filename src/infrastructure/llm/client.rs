//! OpenAI-compatible chat completions adapter for the [`Generator`] port.
//!
//! Targets any endpoint speaking the `/chat/completions` shape -- a local
//! Ollama instance by default. The client is constructed once at startup and
//! handed to the orchestrator; it performs no retries of its own, since a
//! failed call is exactly what the repair loop's budget exists to absorb.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::domain::models::{GeneratorConfig, Turn};
use crate::domain::ports::{Generator, GeneratorError};
use crate::infrastructure::llm::types::{ChatMessage, ChatRequest, ChatResponse};

/// Fixed instruction set defining the output-format contract for the two
/// artifact kinds.
fn system_prompt(top_module: &str) -> String {
    format!(
        "You are an expert hardware design agent.\n\
         1. Output Verilog code strictly inside /// VERILOG START and /// VERILOG END tags.\n\
         2. Output Cocotb (Python) testbench strictly inside /// PYTHON START and /// PYTHON END tags.\n\
         3. The top module MUST be named '{top_module}'.\n\
         4. Do not include markdown formatting (like ```verilog) inside the tags."
    )
}

/// HTTP generation client.
pub struct OpenAiCompatGenerator {
    config: GeneratorConfig,
    client: reqwest::Client,
    system: String,
}

impl OpenAiCompatGenerator {
    /// Create a new client against the configured endpoint.
    pub fn new(config: GeneratorConfig, top_module: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            system: system_prompt(top_module),
            config,
            client,
        })
    }

    fn build_request(&self, history: &[Turn], request: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(&self.system));
        messages.extend(history.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(request));

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        }
    }
}

#[async_trait]
impl Generator for OpenAiCompatGenerator {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn generate(&self, history: &[Turn], request: &str) -> Result<String, GeneratorError> {
        let body = self.build_request(history, request);
        let url = format!("{}/chat/completions", self.config.base_url);

        tracing::debug!(
            url = %url,
            model = %self.config.model,
            history_turns = history.len(),
            "Sending generation request"
        );

        let mut http_request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| GeneratorError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Generation backend returned error");
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::MalformedResponse(e.to_string()))?;

        if let Some(usage) = &parsed.usage {
            tracing::info!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Generation complete"
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(GeneratorError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_the_top_module() {
        let prompt = system_prompt("my_module");
        assert!(prompt.contains("'my_module'"));
        assert!(prompt.contains("/// VERILOG START"));
        assert!(prompt.contains("/// PYTHON START"));
    }

    #[test]
    fn request_layout_is_system_history_then_request() {
        let client =
            OpenAiCompatGenerator::new(GeneratorConfig::default(), "my_module").unwrap();
        let history = vec![
            Turn::assistant("attempt one"),
            Turn::user("it failed, fix it"),
        ];

        let request = client.build_request(&history, "build a 2-bit counter");
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].role, "assistant");
        assert_eq!(request.messages[2].role, "user");
        assert_eq!(request.messages[3].content, "build a 2-bit counter");
        assert!((request.temperature - 0.1).abs() < f32::EPSILON);
        assert!(!request.stream);
    }
}
