//! Query execution behind the mutation gate.
//!
//! Every statement passes through the keyword gate before it reaches the
//! store. Rejections and driver failures both surface as `ExecutionError`
//! so the answer stage can narrate them instead of aborting the request.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::ParleyError;
use crate::safety::is_mutating;
use crate::store::{Store, TabularResult};

/// Message returned when the gate rejects a statement.
pub const GATE_REJECTION: &str = "Only SELECT queries are allowed";

/// A failed execution, either gated or reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    /// Human-readable description of what went wrong.
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ParleyError> for ExecutionError {
    fn from(error: ParleyError) -> Self {
        Self::new(error.detail())
    }
}

/// Outcome of running one statement: a result table or a narratable error.
pub type ExecutionOutcome = std::result::Result<TabularResult, ExecutionError>;

/// Executes SQL against a store, rejecting mutating statements up front.
pub struct QueryExecutor {
    store: Arc<dyn Store>,
}

impl QueryExecutor {
    /// Creates a new executor backed by the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Runs a statement if the gate allows it.
    pub async fn execute(&self, sql: &str) -> ExecutionOutcome {
        if is_mutating(sql) {
            debug!("Gate rejected statement: {}", sql);
            return Err(ExecutionError::new(GATE_REJECTION));
        }

        match self.store.run_query(sql).await {
            Ok(result) => {
                debug!(
                    "Query returned {} rows, {} columns",
                    result.row_count,
                    result.columns.len()
                );
                Ok(result)
            }
            Err(e) => Err(ExecutionError::from(e)),
        }
    }
}
