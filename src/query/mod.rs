//! Gated query execution.
//!
//! This module isolates the mutation gate and SQL execution from the
//! pipeline orchestrator so both can be tested independently.

mod executor;

pub use executor::{ExecutionError, ExecutionOutcome, QueryExecutor, GATE_REJECTION};
