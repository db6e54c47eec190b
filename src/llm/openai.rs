//! OpenAI LLM client implementation.
//!
//! Implements the LlmClient trait for OpenAI's Chat Completions API.
//! Azure OpenAI deployments serve the same payload shape behind a different
//! URL and auth header, so Azure routing lives here as a config option
//! rather than as a separate provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ParleyError, Result};
use crate::llm::types::{Message, SamplingParams};
use crate::llm::LlmClient;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// OpenAI API base URL.
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// API version sent to Azure OpenAI deployments.
const AZURE_API_VERSION: &str = "2024-06-01";

/// Maximum number of retry attempts for transient errors.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// OpenAI client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Model to use (e.g., "gpt-4o"). For Azure this is the deployment name.
    pub model: String,
    /// Azure OpenAI resource endpoint; None targets the public API.
    pub azure_endpoint: Option<String>,
    /// API version for Azure requests.
    pub api_version: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Creates a new config with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            azure_endpoint: None,
            api_version: AZURE_API_VERSION.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Routes requests to an Azure OpenAI resource instead of the public API.
    ///
    /// `model` is then interpreted as the deployment name.
    pub fn with_azure_endpoint(
        mut self,
        endpoint: &str,
        api_version: Option<&str>,
    ) -> Result<Self> {
        let url = Url::parse(endpoint).map_err(|e| {
            ParleyError::config(format!("Invalid Azure endpoint '{}': {}", endpoint, e))
        })?;

        self.azure_endpoint = Some(url.as_str().trim_end_matches('/').to_string());
        if let Some(version) = api_version {
            self.api_version = version.to_string();
        }

        Ok(self)
    }

    /// Returns the request URL for the configured target.
    fn request_url(&self) -> String {
        match &self.azure_endpoint {
            Some(endpoint) => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint, self.model, self.api_version
            ),
            None => OPENAI_API_URL.to_string(),
        }
    }
}

/// OpenAI LLM client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiClient {
    /// Creates a new OpenAI client with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ParleyError::llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Converts internal messages to OpenAI API format.
    fn convert_messages(messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|m| OpenAiMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    /// Parses an API error response and returns (error, is_retryable).
    fn parse_error(status: reqwest::StatusCode, body: &str) -> (ParleyError, bool) {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return (
                ParleyError::llm("Authentication failed. Check your API key."),
                false,
            );
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return (
                ParleyError::llm("Rate limited. Please wait and try again."),
                true, // Rate limits are retryable
            );
        }

        // 5xx errors are generally retryable
        let is_retryable = status.is_server_error();

        // Try to parse error message from response
        if let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            return (
                ParleyError::llm(format!(
                    "OpenAI API error: {}",
                    error_response.error.message
                )),
                is_retryable,
            );
        }

        (
            ParleyError::llm(format!("OpenAI API error ({}): {}", status, body)),
            is_retryable,
        )
    }

    /// Determines if a request error is retryable.
    fn is_retryable_request_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect()
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message], params: &SamplingParams) -> Result<String> {
        let request = OpenAiRequest {
            model: self.config.model.clone(),
            messages: Self::convert_messages(messages),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let url = self.config.request_url();
        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!(
                "OpenAI API request attempt {} of {}",
                attempt, MAX_RETRY_ATTEMPTS
            );

            let mut builder = self
                .client
                .post(&url)
                .header("Content-Type", "application/json");

            // Azure authenticates with a dedicated header, not a bearer token
            builder = if self.config.azure_endpoint.is_some() {
                builder.header("api-key", &self.config.api_key)
            } else {
                builder.header("Authorization", format!("Bearer {}", self.config.api_key))
            };

            let result = builder.json(&request).send().await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.map_err(|e| {
                        ParleyError::llm(format!("Failed to read response: {}", e))
                    })?;

                    if status.is_success() {
                        let response: OpenAiResponse =
                            serde_json::from_str(&body).map_err(|e| {
                                ParleyError::llm(format!("Failed to parse response: {}", e))
                            })?;

                        return response
                            .choices
                            .into_iter()
                            .next()
                            .map(|c| c.message.content)
                            .ok_or_else(|| ParleyError::llm("No response from OpenAI"));
                    }

                    let (error, is_retryable) = Self::parse_error(status, &body);
                    last_error = Some(error);

                    if !is_retryable || attempt >= MAX_RETRY_ATTEMPTS {
                        break;
                    }

                    warn!(
                        "OpenAI API request failed (attempt {}), retrying in {:?}: {}",
                        attempt, delay, status
                    );
                }
                Err(e) => {
                    let is_retryable = Self::is_retryable_request_error(&e);
                    let error = if e.is_timeout() {
                        ParleyError::timeout("Request timed out. Try again.")
                    } else if e.is_connect() {
                        ParleyError::llm("Failed to connect to the API. Check your network.")
                    } else {
                        ParleyError::llm(format!("Request failed: {}", e))
                    };
                    last_error = Some(error);

                    if !is_retryable || attempt >= MAX_RETRY_ATTEMPTS {
                        break;
                    }

                    warn!(
                        "OpenAI API request failed (attempt {}), retrying in {:?}",
                        attempt, delay
                    );
                }
            }

            tokio::time::sleep(delay).await;
            delay *= 2; // Exponential backoff
        }

        Err(last_error.expect("at least one attempt was made"))
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
}
