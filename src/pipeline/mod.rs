//! Question answering pipeline for Parley.
//!
//! Orchestrates the five request stages: validate the question, synthesize
//! SQL, gate and execute it, narrate the result, and assemble the response
//! envelope. The LLM stages and the store are injected so the whole
//! pipeline runs against fakes in tests.

mod answer_synth;
mod sql_synth;

pub use answer_synth::AnswerSynthesizer;
pub use sql_synth::SqlSynthesizer;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ParleyError;
use crate::llm::LlmClient;
use crate::query::{ExecutionOutcome, QueryExecutor};
use crate::safety::{audit_sql, SqlAudit};
use crate::store::{Catalog, Row, Store};

/// Maximum number of rows included in a response envelope.
pub const ENVELOPE_PREVIEW_ROWS: usize = 10;

/// Canned questions surfaced by `parley suggest`.
pub const EXAMPLE_QUESTIONS: [&str; 10] = [
    "List the top 10 best-selling products",
    "Show customers from the United States",
    "What are the total sales by category?",
    "Which employees have processed the most orders?",
    "Show products that are low in stock",
    "List orders from the last 30 days",
    "What are the most popular shipping companies?",
    "Show suppliers by country",
    "Which regions have the highest sales?",
    "List discontinued products",
];

/// Everything a caller needs to present one answered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// The question as asked, after trimming.
    pub question: String,
    /// The SQL the LLM produced.
    pub sql_query: String,
    /// The natural language answer.
    pub response: String,
    /// Up to `ENVELOPE_PREVIEW_ROWS` of the result, empty on failure.
    pub data: Vec<Row>,
    /// Result column names, empty on failure.
    pub columns: Vec<String>,
    /// Full result row count before the preview cap.
    pub total_rows: usize,
}

/// A request that could not produce an envelope.
///
/// Raised for empty questions and for LLM stage failures. Execution errors
/// are not request errors; they flow into the envelope as narrated answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestError {
    /// Human-readable description, serialized under an `error` key.
    #[serde(rename = "error")]
    pub message: String,
}

impl RequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RequestError {}

/// The question answering pipeline.
pub struct Pipeline {
    catalog: Catalog,
    sql: SqlSynthesizer,
    answers: AnswerSynthesizer,
    executor: QueryExecutor,
}

impl Pipeline {
    /// Creates a pipeline over an already-discovered catalog.
    pub fn new(catalog: Catalog, store: Arc<dyn Store>, client: Arc<dyn LlmClient>) -> Self {
        Self {
            catalog,
            sql: SqlSynthesizer::new(Arc::clone(&client)),
            answers: AnswerSynthesizer::new(client),
            executor: QueryExecutor::new(store),
        }
    }

    /// Discovers the schema once and builds a pipeline over it.
    pub async fn bootstrap(
        store: Arc<dyn Store>,
        client: Arc<dyn LlmClient>,
    ) -> crate::error::Result<Self> {
        let catalog = store.discover().await?;
        info!("Discovered {} tables", catalog.tables.len());
        Ok(Self::new(catalog, store, client))
    }

    /// The schema this pipeline answers questions over.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Answers one question end to end.
    pub async fn answer_question(
        &self,
        question: &str,
    ) -> std::result::Result<ResponseEnvelope, RequestError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RequestError::new("Please provide a question"));
        }

        let sql = self
            .sql
            .synthesize(question, &self.catalog)
            .await
            .map_err(|e| stage_error("Error generating query: ", &e))?;

        // Advisory only; the keyword gate and read-only connection decide.
        match audit_sql(&sql) {
            SqlAudit::ReadOnly => {}
            SqlAudit::Write(keyword) => {
                warn!("Synthesized SQL parses as a {} statement", keyword);
            }
            SqlAudit::Unparsed(reason) => {
                debug!("Synthesized SQL did not parse: {}", reason);
            }
        }

        let outcome = self.executor.execute(&sql).await;

        let response = self
            .answers
            .synthesize(question, &sql, &outcome)
            .await
            .map_err(|e| stage_error("Error generating response: ", &e))?;

        Ok(assemble_envelope(question, sql, response, outcome))
    }
}

fn assemble_envelope(
    question: &str,
    sql: String,
    response: String,
    outcome: ExecutionOutcome,
) -> ResponseEnvelope {
    let (data, columns, total_rows) = match outcome {
        Ok(result) => (
            result
                .rows
                .into_iter()
                .take(ENVELOPE_PREVIEW_ROWS)
                .collect(),
            result.columns,
            result.row_count,
        ),
        Err(_) => (Vec::new(), Vec::new(), 0),
    };

    ResponseEnvelope {
        question: question.to_string(),
        sql_query: sql,
        response,
        data,
        columns,
        total_rows,
    }
}

/// Maps an LLM stage failure to a request error.
///
/// LLM and timeout details are user-actionable and keep their stage prefix;
/// anything else is reported generically.
fn stage_error(prefix: &str, error: &ParleyError) -> RequestError {
    match error {
        ParleyError::Llm(detail) | ParleyError::Timeout(detail) => {
            RequestError::new(format!("{}{}", prefix, detail))
        }
        other => RequestError::new(format!("An error occurred: {}", other.detail())),
    }
}
