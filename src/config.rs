//! Configuration management for Parley.
//!
//! Handles loading configuration from a TOML file, with LLM provider
//! settings and the database location. API keys never live here; they
//! come from environment variables.

use crate::error::{ParleyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Parley.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider: "openai", "anthropic", or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name (e.g., "gpt-4o", "claude-3-5-sonnet-latest").
    /// Defaults per provider when unset.
    #[serde(default)]
    pub model: Option<String>,

    /// Azure OpenAI endpoint. Unset means the public OpenAI API.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Azure API version, only meaningful with an endpoint.
    #[serde(default)]
    pub api_version: Option<String>,

    /// LLM request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            endpoint: None,
            api_version: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite business database.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("business_data.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ParleyError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ParleyError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
