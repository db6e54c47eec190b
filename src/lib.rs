//! Parley - ask questions about a business database in plain English.
//!
//! This library exposes the core modules for use in integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod query;
pub mod safety;
pub mod store;
