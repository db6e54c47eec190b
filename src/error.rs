//! Error types for Parley.
//!
//! This module defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for Parley operations.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// The database file could not be opened at all.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Query execution errors reported by the database engine.
    #[error("Query error: {0}")]
    Query(String),

    /// LLM API call errors.
    #[error("LLM error: {0}")]
    Llm(String),

    /// An operation exceeded its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Configuration loading or validation errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors that shouldn't normally occur.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Creates a store-unavailable error with the given message.
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a timeout error with the given message.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the inner message without the category prefix.
    ///
    /// User-facing surfaces compose their own framing around this.
    pub fn detail(&self) -> &str {
        match self {
            Self::StoreUnavailable(msg)
            | Self::Query(msg)
            | Self::Llm(msg)
            | Self::Timeout(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg,
        }
    }

    /// Returns the category of the error for logging purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "Store Unavailable",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Timeout(_) => "Timeout",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias for Parley operations.
pub type Result<T> = std::result::Result<T, ParleyError>;
