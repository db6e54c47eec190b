//! Mock stores for testing.
//!
//! Provides an in-memory store implementation for headless testing.

use super::{Catalog, Store, TabularResult};
use crate::error::{ParleyError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A mock store that returns predefined results and counts queries.
#[derive(Default)]
pub struct MockStore {
    catalog: Catalog,
    result: TabularResult,
    queries: Mutex<Vec<String>>,
    query_calls: AtomicUsize,
}

impl MockStore {
    /// Creates a mock store with an empty catalog and empty results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock store that discovers the given catalog.
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// Creates a mock store that returns the given result for every query.
    pub fn with_result(result: TabularResult) -> Self {
        Self {
            result,
            ..Self::default()
        }
    }

    /// Sets the catalog returned by `discover`.
    pub fn and_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Number of `run_query` calls made so far.
    pub fn query_count(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Returns the queries received so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Store for MockStore {
    async fn discover(&self) -> Result<Catalog> {
        Ok(self.catalog.clone())
    }

    async fn run_query(&self, sql: &str) -> Result<TabularResult> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(sql.to_string());
        Ok(self.result.clone())
    }
}

/// A store whose every query fails with a fixed message.
pub struct FailingStore {
    message: String,
}

impl FailingStore {
    /// Creates a store that fails queries with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn discover(&self) -> Result<Catalog> {
        Ok(Catalog::default())
    }

    async fn run_query(&self, _sql: &str) -> Result<TabularResult> {
        Err(ParleyError::query(self.message.clone()))
    }
}
