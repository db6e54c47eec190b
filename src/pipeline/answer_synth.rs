//! Answer synthesis stage.
//!
//! Turns query results back into a conversational answer. Failed executions
//! are narrated directly without calling the LLM.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::error::Result;
use crate::llm::{LlmClient, Message, SamplingParams};
use crate::query::ExecutionOutcome;
use crate::store::TabularResult;

/// Warmer sampling than the SQL stage; answers are prose, not code.
const ANSWER_SAMPLING: SamplingParams = SamplingParams::new(0.3, 800);

/// How many rows of the result are quoted in the prompt.
const PREVIEW_ROWS: usize = 5;

const ANSWER_PROMPT_TEMPLATE: &str = r#"You are an AI data analyst. Provide a clear, natural language response to the user's question based on the SQL query results.

User Question: {question}
SQL Query Used: {sql}
Query Results: {results}

Provide a helpful, conversational response that:
1. Directly answers the user's question
2. Highlights key insights from the data
3. Uses natural language, not technical jargon
4. Mentions specific numbers and details when relevant

Response:"#;

/// Narrates execution outcomes as natural language answers.
pub struct AnswerSynthesizer {
    client: Arc<dyn LlmClient>,
}

impl AnswerSynthesizer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Produces the final answer text for an execution outcome.
    ///
    /// Execution errors short-circuit to a fixed phrasing so the user sees
    /// what went wrong even when the LLM is unreachable.
    pub async fn synthesize(
        &self,
        question: &str,
        sql: &str,
        outcome: &ExecutionOutcome,
    ) -> Result<String> {
        let result = match outcome {
            Ok(result) => result,
            Err(error) => {
                return Ok(format!("I encountered an error: {}", error.message));
            }
        };

        let prompt = build_prompt(question, sql, result);
        let messages = [Message::user(prompt)];

        let start = Instant::now();
        let completion = self.client.complete(&messages, &ANSWER_SAMPLING).await?;

        debug!("Synthesized answer in {:?}", start.elapsed());
        Ok(completion.trim().to_string())
    }
}

fn build_prompt(question: &str, sql: &str, result: &TabularResult) -> String {
    ANSWER_PROMPT_TEMPLATE
        .replace("{question}", question)
        .replace("{sql}", sql)
        .replace("{results}", &render_results(result))
}

/// Renders a result table for the prompt: column names, the total row
/// count, and at most `PREVIEW_ROWS` sample rows.
fn render_results(result: &TabularResult) -> String {
    if result.is_empty() {
        return "No data found".to_string();
    }

    let mut rendered = format!("Columns: {}\n", result.columns.join(", "));
    rendered.push_str(&format!("Row count: {}\n", result.row_count));
    rendered.push_str("Sample data:\n");

    for (i, row) in result.rows.iter().take(PREVIEW_ROWS).enumerate() {
        let values: Vec<String> = row.iter().map(|v| v.to_display_string()).collect();
        rendered.push_str(&format!("Row {}: ({})\n", i + 1, values.join(", ")));
    }

    rendered
}
