//! Anthropic LLM client implementation.
//!
//! Implements the LlmClient trait for Anthropic's Messages API. Unlike the
//! chat-completions shape, system prompts travel as a dedicated request
//! field and replies come back as a list of content blocks.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ParleyError, Result};
use crate::llm::types::{Message, Role, SamplingParams};
use crate::llm::LlmClient;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Anthropic Messages API endpoint.
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// Value of the required `anthropic-version` header.
const API_VERSION: &str = "2023-06-01";

/// Anthropic client configuration.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Model to use (e.g., "claude-3-5-sonnet-latest").
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl AnthropicConfig {
    /// Creates a new config with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Anthropic LLM client.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicClient {
    /// Creates a new Anthropic client with the given configuration.
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ParleyError::llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Splits a message list into the system prompt and the wire messages.
    ///
    /// The Messages API rejects a "system" role inside the message list,
    /// so the last system message becomes the request's system field.
    fn split_system(messages: &[Message]) -> (Option<String>, Vec<WireMessage>) {
        let system = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone());

        let wire = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| WireMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();

        (system, wire)
    }

    /// Maps an unsuccessful HTTP response to an LLM error.
    fn error_for(status: StatusCode, body: &str) -> ParleyError {
        match status {
            StatusCode::UNAUTHORIZED => {
                ParleyError::llm("Authentication failed. Check your ANTHROPIC_API_KEY.")
            }
            StatusCode::TOO_MANY_REQUESTS => {
                ParleyError::llm("Rate limited. Please wait and try again.")
            }
            _ => match serde_json::from_str::<ApiErrorBody>(body) {
                Ok(parsed) => {
                    ParleyError::llm(format!("Anthropic API error: {}", parsed.error.message))
                }
                Err(_) => ParleyError::llm(format!("Anthropic API error ({}): {}", status, body)),
            },
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, messages: &[Message], params: &SamplingParams) -> Result<String> {
        let (system, wire_messages) = Self::split_system(messages);

        let request = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system,
            messages: wire_messages,
        };

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ParleyError::timeout("Request timed out. Try again.")
                } else if e.is_connect() {
                    ParleyError::llm("Failed to connect to Anthropic API. Check your network.")
                } else {
                    ParleyError::llm(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ParleyError::llm(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Self::error_for(status, &body));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| ParleyError::llm(format!("Failed to parse response: {}", e)))?;

        // One reply may span several text blocks; concatenate them
        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(ParleyError::llm("No response from Anthropic"));
        }

        Ok(text)
    }
}

// Messages API wire types

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
