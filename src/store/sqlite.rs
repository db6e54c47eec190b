//! SQLite store implementation.
//!
//! Provides the `SqliteStore` struct that implements the `Store` trait
//! using sqlx. Every call opens a fresh read-only connection.

use crate::error::{ParleyError, Result};
use crate::store::{Catalog, ColumnDescriptor, Row, Store, TableInfo, TabularResult, Value};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column as SqlxColumn, ConnectOptions, Connection, Executor, Row as SqlxRow, Statement, TypeInfo};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::debug;

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// SQLite store over a single database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Creates a store over the database file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Opens a fresh read-only connection.
    ///
    /// Writes are rejected by the connection itself, independent of any
    /// query text inspection upstream.
    async fn open(&self) -> std::result::Result<SqliteConnection, sqlx::Error> {
        SqliteConnectOptions::new()
            .filename(&self.path)
            .read_only(true)
            .connect()
            .await
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn discover(&self) -> Result<Catalog> {
        let mut conn = self.open().await.map_err(|e| {
            ParleyError::store_unavailable(format!(
                "Cannot open database at {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let table_names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&mut conn)
        .await
        .map_err(|e| ParleyError::query(format!("Failed to fetch tables: {e}")))?;

        let mut tables = Vec::with_capacity(table_names.len());

        for table_name in table_names {
            let columns: Vec<(String, String)> =
                sqlx::query_as("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
                    .bind(&table_name)
                    .fetch_all(&mut conn)
                    .await
                    .map_err(|e| {
                        ParleyError::query(format!(
                            "Failed to fetch columns for {table_name}: {e}"
                        ))
                    })?;

            tables.push(TableInfo {
                name: table_name,
                columns: columns
                    .into_iter()
                    .map(|(name, declared_type)| ColumnDescriptor {
                        name,
                        declared_type,
                    })
                    .collect(),
            });
        }

        conn.close().await.ok();

        debug!("Discovered {} tables", tables.len());

        Ok(Catalog { tables })
    }

    async fn run_query(&self, sql: &str) -> Result<TabularResult> {
        let start = Instant::now();

        let mut conn = self
            .open()
            .await
            .map_err(|e| ParleyError::query(format!("Cannot open database: {e}")))?;

        // Use a timeout for query execution
        let result = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql).fetch_all(&mut conn),
        )
        .await
        .map_err(|_| {
            ParleyError::timeout(format!("Query timed out after {QUERY_TIMEOUT_SECS} seconds"))
        })?
        .map_err(|e| ParleyError::query(format_query_error(e)))?;

        // Extract column names - from the first row if available, otherwise
        // from the prepared statement (empty result sets still have columns)
        let columns: Vec<String> = if let Some(first_row) = result.first() {
            first_row
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect()
        } else {
            statement_columns(&mut conn, sql).await.unwrap_or_default()
        };

        let rows: Vec<Row> = result.iter().map(convert_row).collect();

        conn.close().await.ok();

        debug!("Query returned {} rows in {:?}", rows.len(), start.elapsed());

        Ok(TabularResult::with_data(columns, rows))
    }
}

/// Recovers column names for an empty result set by preparing the statement.
async fn statement_columns(conn: &mut SqliteConnection, sql: &str) -> Result<Vec<String>> {
    let statement = conn
        .prepare(sql)
        .await
        .map_err(|e| ParleyError::query(format_query_error(e)))?;

    Ok(statement
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect())
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a SqliteRow to our Value type.
fn convert_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    // SQLite reports the declared column type where it has one and the
    // runtime storage class otherwise, so match on both spellings
    match type_name.to_uppercase().as_str() {
        "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" | "BOOLEAN" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Blob)
            .unwrap_or(Value::Null),

        // For all other types, try to get as string
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::Text)
            .unwrap_or(Value::Null),
    }
}

/// Formats a query error, preferring the engine's own message.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}
