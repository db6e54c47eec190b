//! Mock LLM client for testing.
//!
//! Returns scripted responses in order, without making real API calls.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{ParleyError, Result};
use crate::llm::types::{Message, Role, SamplingParams};
use crate::llm::LlmClient;

/// Mock LLM client that replays a script of canned completions.
///
/// Each call to `complete` pops the next scripted response. Once the script is
/// exhausted the client either fails (if configured) or returns a stock answer.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Responses returned in order, one per call.
    script: Mutex<VecDeque<String>>,
    /// Error detail returned once the script runs out.
    failure: Option<String>,
    /// Number of completions requested so far.
    calls: AtomicUsize,
    /// The last user message of every request, in call order.
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// Creates a mock client with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock client that replays the given responses in order.
    pub fn with_script<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(responses.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Fails with the given error detail once the script is exhausted.
    pub fn then_fail(mut self, detail: impl Into<String>) -> Self {
        self.failure = Some(detail.into());
        self
    }

    /// Creates a mock client that fails every call with the given detail.
    pub fn failing(detail: impl Into<String>) -> Self {
        Self::new().then_fail(detail)
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The last user message of every request, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message], _params: &SamplingParams) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push(Self::extract_user_input(messages));

        if let Some(response) = self.script.lock().unwrap().pop_front() {
            return Ok(response);
        }

        if let Some(detail) = &self.failure {
            return Err(ParleyError::llm(detail.clone()));
        }

        Ok("I don't have an answer for that.".to_string())
    }
}
