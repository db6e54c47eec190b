//! Integration tests for Parley.
//!
//! These tests run against temporary SQLite files and the in-crate mock
//! LLM client. No network access or API keys required.

pub mod loader_test;
pub mod pipeline_test;
pub mod store_test;
