//! LLM integration for Parley.
//!
//! Provides the completion trait, the provider implementations, and the
//! factory that resolves provider, credentials, and model from configuration.

pub mod anthropic;
pub mod mock;
pub mod openai;
pub mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use types::{Message, Role, SamplingParams};

use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{ParleyError, Result};

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given messages.
    ///
    /// Returns the complete response as a single string.
    async fn complete(&self, messages: &[Message], params: &SamplingParams) -> Result<String>;
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// OpenAI (GPT-4o, etc.), including Azure OpenAI deployments
    #[default]
    OpenAi,
    /// Anthropic (Claude)
    Anthropic,
    /// Mock client for testing (no API key required)
    Mock,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Creates an LLM client from the configuration.
///
/// API keys are resolved from the environment (`OPENAI_API_KEY`,
/// `AZURE_OPENAI_API_KEY` when an Azure endpoint is configured,
/// `ANTHROPIC_API_KEY`); they are never read from the config file.
///
/// Model selection falls back per provider when the config leaves it unset:
/// - `OPENAI_MODEL` (defaults to "gpt-4o")
/// - `ANTHROPIC_MODEL` (defaults to "claude-3-5-sonnet-latest")
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let provider = config
        .provider
        .parse::<LlmProvider>()
        .map_err(ParleyError::config)?;

    match provider {
        LlmProvider::OpenAi => {
            let key = resolve_openai_key(config)?;
            let model = config
                .model
                .clone()
                .or_else(|| std::env::var("OPENAI_MODEL").ok())
                .unwrap_or_else(|| "gpt-4o".to_string());

            let mut openai_config = OpenAiConfig::new(key, model).with_timeout(config.timeout_secs);
            if let Some(endpoint) = &config.endpoint {
                openai_config =
                    openai_config.with_azure_endpoint(endpoint, config.api_version.as_deref())?;
            }

            Ok(Arc::new(OpenAiClient::new(openai_config)?))
        }
        LlmProvider::Anthropic => {
            let key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
                ParleyError::config("No API key configured. Set ANTHROPIC_API_KEY.")
            })?;
            let model = config
                .model
                .clone()
                .or_else(|| std::env::var("ANTHROPIC_MODEL").ok())
                .unwrap_or_else(|| "claude-3-5-sonnet-latest".to_string());

            Ok(Arc::new(AnthropicClient::new(
                AnthropicConfig::new(key, model).with_timeout(config.timeout_secs),
            )?))
        }
        LlmProvider::Mock => Ok(Arc::new(MockLlmClient::new())),
    }
}

/// Resolves the OpenAI API key, preferring the Azure-specific variable when
/// an Azure endpoint is configured.
fn resolve_openai_key(config: &LlmConfig) -> Result<String> {
    if config.endpoint.is_some() {
        if let Ok(key) = std::env::var("AZURE_OPENAI_API_KEY") {
            return Ok(key);
        }
    }

    std::env::var("OPENAI_API_KEY").map_err(|_| {
        ParleyError::config(
            "No API key configured. Set OPENAI_API_KEY (or AZURE_OPENAI_API_KEY for Azure endpoints).",
        )
    })
}
