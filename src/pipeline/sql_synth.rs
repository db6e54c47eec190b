//! SQL synthesis stage.
//!
//! Turns a natural language question plus the discovered schema into a
//! single SQL statement via the LLM.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::error::Result;
use crate::llm::{LlmClient, Message, SamplingParams};
use crate::store::Catalog;

/// Near-deterministic sampling with a small budget, enough for one statement.
const SQL_SAMPLING: SamplingParams = SamplingParams::new(0.1, 500);

const SQL_PROMPT_TEMPLATE: &str = r#"You are an expert SQL query generator. Given a natural language question, generate a precise SQL query.

Database Schema:
{schema}
Important Rules:
1. Only use SELECT statements
2. Use proper table and column names from the schema
3. Use appropriate JOINs when needed
4. Include LIMIT clauses for large result sets
5. Use proper date formatting and filtering
6. Return only the SQL query, no explanations

User Question: {question}

SQL Query:"#;

/// Generates SQL for a question against a known schema.
pub struct SqlSynthesizer {
    client: Arc<dyn LlmClient>,
}

impl SqlSynthesizer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Asks the LLM for a SQL statement answering `question`.
    ///
    /// The completion is stripped of markdown code fences but otherwise
    /// returned verbatim; validity is the executor's concern.
    pub async fn synthesize(&self, question: &str, catalog: &Catalog) -> Result<String> {
        let prompt = build_prompt(question, catalog);
        let messages = [Message::user(prompt)];

        let start = Instant::now();
        let completion = self.client.complete(&messages, &SQL_SAMPLING).await?;
        let sql = strip_code_fences(&completion);

        debug!(
            "Synthesized SQL in {:?} ({} chars)",
            start.elapsed(),
            sql.len()
        );
        Ok(sql)
    }
}

fn build_prompt(question: &str, catalog: &Catalog) -> String {
    SQL_PROMPT_TEMPLATE
        .replace("{schema}", &catalog.render_for_prompt())
        .replace("{question}", question)
}

/// Removes markdown code fences the model tends to wrap SQL in.
fn strip_code_fences(completion: &str) -> String {
    completion
        .replace("```sql", "")
        .replace("```", "")
        .trim()
        .to_string()
}
