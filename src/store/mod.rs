//! Store abstraction layer for Parley.
//!
//! Provides a trait-based interface over the SQLite business database,
//! allowing the pipeline to run against fakes in tests.

mod catalog;
mod mock;
mod sqlite;
mod types;

pub use catalog::{Catalog, ColumnDescriptor, TableInfo};
pub use mock::{FailingStore, MockStore};
pub use sqlite::SqliteStore;
pub use types::{Row, TabularResult, Value};

use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the interface for stores the pipeline can query.
///
/// All operations are async and return Results with ParleyError.
#[async_trait]
pub trait Store: Send + Sync {
    /// Enumerates every base table with its ordered column list.
    async fn discover(&self) -> Result<Catalog>;

    /// Runs a SQL query and returns the full result set.
    async fn run_query(&self, sql: &str) -> Result<TabularResult>;
}
