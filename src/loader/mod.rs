//! Dataset loader for Parley.
//!
//! Downloads the Northwind CSV exports, infers column types, and rebuilds
//! the SQLite business database from scratch. A failed table download skips
//! that table and moves on; the summary reports what made it in.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions};
use sqlx::{ConnectOptions, Connection, Sqlite, SqliteConnection};
use tracing::{debug, info, warn};

use crate::error::{ParleyError, Result};

/// Timeout for each CSV download.
const DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Every table in the dataset with its hosted CSV export.
pub const CSV_SOURCES: [(&str, &str); 10] = [
    (
        "suppliers",
        "https://hebbkx1anhila5yf.public.blob.vercel-storage.com/suppliers-I8lmFbGJ9zwuVa6oIsUEEPuwvQPgKh.csv",
    ),
    (
        "region",
        "https://hebbkx1anhila5yf.public.blob.vercel-storage.com/region-lhFJcpXUrJB3mFEqJjesKQTqmFm8Au.csv",
    ),
    (
        "shippers",
        "https://hebbkx1anhila5yf.public.blob.vercel-storage.com/shippers-ngsXPYQhoeJYAymKGNdP4oh46kdOrz.csv",
    ),
    (
        "products",
        "https://hebbkx1anhila5yf.public.blob.vercel-storage.com/products-4Mm12pB2wuM84QLZ8KhFGo94ChBav7.csv",
    ),
    (
        "categories",
        "https://hebbkx1anhila5yf.public.blob.vercel-storage.com/categories-GQSrYmCeZrwZEQq6gepZ9Ero90hvuY.csv",
    ),
    (
        "employees",
        "https://hebbkx1anhila5yf.public.blob.vercel-storage.com/employees-cE2BN5wGh4WtEBNixwTVvIXkzCl4el.csv",
    ),
    (
        "order_details",
        "https://hebbkx1anhila5yf.public.blob.vercel-storage.com/order_details-2cQuu9tYvGpXfwhTwKgULXgaA9R2tQ.csv",
    ),
    (
        "customers",
        "https://hebbkx1anhila5yf.public.blob.vercel-storage.com/customers-2JukdKBfh5MyNCF6LxtLhDA9gLx6vR.csv",
    ),
    (
        "employee_territory",
        "https://hebbkx1anhila5yf.public.blob.vercel-storage.com/employee_territory-E6cVsJ7jko2qSEwbGBVSe6rwKwuNPm.csv",
    ),
    (
        "orders",
        "https://hebbkx1anhila5yf.public.blob.vercel-storage.com/orders-9JtFjBCFyPWLxQbvjOJ6ihZ8aS2rMc.csv",
    ),
];

/// Indexes on the common join columns, created after loading.
const INDEX_STATEMENTS: [&str; 7] = [
    "CREATE INDEX IF NOT EXISTS idx_products_supplier ON products(SupplierID)",
    "CREATE INDEX IF NOT EXISTS idx_products_category ON products(CategoryID)",
    "CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(CustomerID)",
    "CREATE INDEX IF NOT EXISTS idx_orders_employee ON orders(EmployeeID)",
    "CREATE INDEX IF NOT EXISTS idx_order_details_order ON order_details(OrderID)",
    "CREATE INDEX IF NOT EXISTS idx_order_details_product ON order_details(ProductID)",
    "CREATE INDEX IF NOT EXISTS idx_employees_territory ON employee_territory(EmployeeID)",
];

/// What a setup run accomplished.
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    /// Tables created and filled.
    pub tables_loaded: usize,
    /// Total rows inserted across all tables.
    pub rows_loaded: usize,
    /// Tables that failed, as "table: reason" strings.
    pub failures: Vec<String>,
}

/// SQLite column affinity assigned during inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    fn as_sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

/// Rebuilds the database at `path` from the hosted CSV exports.
///
/// Any existing file is removed first, so a run always starts clean.
pub async fn setup_database(path: &Path) -> Result<LoadSummary> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ParleyError::internal(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    if path.exists() {
        std::fs::remove_file(path).map_err(|e| {
            ParleyError::internal(format!(
                "Cannot remove existing database at {}: {}",
                path.display(),
                e
            ))
        })?;
        info!("Removed existing database at {}", path.display());
    }

    let mut conn = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .connect()
        .await
        .map_err(|e| {
            ParleyError::store_unavailable(format!(
                "Cannot create database at {}: {}",
                path.display(),
                e
            ))
        })?;

    let client = Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .build()
        .map_err(|e| ParleyError::internal(format!("Failed to create HTTP client: {}", e)))?;

    let mut summary = LoadSummary::default();

    for (table, url) in CSV_SOURCES {
        info!("Downloading {}", table);
        let csv_text = match download_csv(&client, url).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping {}: {}", table, e);
                summary.failures.push(format!("{}: {}", table, e.detail()));
                continue;
            }
        };

        match load_csv_table(&mut conn, table, &csv_text).await {
            Ok(rows) => {
                debug!("Loaded {} rows into {}", rows, table);
                summary.tables_loaded += 1;
                summary.rows_loaded += rows;
            }
            Err(e) => {
                warn!("Skipping {}: {}", table, e);
                summary.failures.push(format!("{}: {}", table, e.detail()));
            }
        }
    }

    if let Err(e) = create_indexes(&mut conn).await {
        warn!("Could not create some indexes: {}", e);
    }

    conn.close().await.ok();
    Ok(summary)
}

async fn download_csv(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ParleyError::timeout(format!(
                "Download timed out after {} seconds",
                DOWNLOAD_TIMEOUT_SECS
            ))
        } else {
            ParleyError::internal(format!("Download failed: {}", e))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ParleyError::internal(format!(
            "Download failed: HTTP {}",
            status
        )));
    }

    response
        .text()
        .await
        .map_err(|e| ParleyError::internal(format!("Download failed: {}", e)))
}

/// Replaces `table` with the contents of one CSV export.
///
/// Column types are inferred from the data, headers are normalized to
/// identifier-safe names, and all rows go in under one transaction.
pub async fn load_csv_table(
    conn: &mut SqliteConnection,
    table: &str,
    csv_text: &str,
) -> Result<usize> {
    let (headers, records) = parse_csv(csv_text)?;
    if headers.is_empty() {
        return Err(ParleyError::query(format!(
            "CSV for {} has no header row",
            table
        )));
    }

    let types: Vec<ColumnType> = (0..headers.len())
        .map(|i| infer_column_type(records.iter().map(|record| record[i].as_str())))
        .collect();

    sqlx::query(&format!(r#"DROP TABLE IF EXISTS "{}""#, table))
        .execute(&mut *conn)
        .await
        .map_err(|e| ParleyError::query(format!("Failed to reset table {}: {}", table, e)))?;

    sqlx::query(&build_create_table(table, &headers, &types))
        .execute(&mut *conn)
        .await
        .map_err(|e| ParleyError::query(format!("Failed to create table {}: {}", table, e)))?;

    let placeholders = vec!["?"; headers.len()].join(", ");
    let insert_sql = format!(r#"INSERT INTO "{}" VALUES ({})"#, table, placeholders);

    let mut tx = conn
        .begin()
        .await
        .map_err(|e| ParleyError::query(format!("Failed to start transaction: {}", e)))?;

    for record in &records {
        let mut query = sqlx::query(&insert_sql);
        for (value, column_type) in record.iter().zip(&types) {
            query = bind_typed(query, value, *column_type);
        }
        query
            .execute(&mut *tx)
            .await
            .map_err(|e| ParleyError::query(format!("Failed to insert into {}: {}", table, e)))?;
    }

    tx.commit()
        .await
        .map_err(|e| ParleyError::query(format!("Failed to commit {}: {}", table, e)))?;

    Ok(records.len())
}

/// Creates the join indexes. Statements are idempotent; tables that failed
/// to load make their index statements fail, which the caller tolerates.
pub async fn create_indexes(conn: &mut SqliteConnection) -> Result<()> {
    for statement in INDEX_STATEMENTS {
        sqlx::query(statement)
            .execute(&mut *conn)
            .await
            .map_err(|e| ParleyError::query(format!("Failed to create index: {}", e)))?;
    }
    Ok(())
}

/// Parses CSV text into cleaned headers and rows padded to the header width.
fn parse_csv(csv_text: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ParleyError::query(format!("Invalid CSV header: {}", e)))?
        .iter()
        .map(clean_column_name)
        .collect();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ParleyError::query(format!("Invalid CSV row: {}", e)))?;
        let mut row: Vec<String> = record.iter().map(|field| field.to_string()).collect();
        row.resize(headers.len(), String::new());
        records.push(row);
    }

    Ok((headers, records))
}

/// Normalizes a CSV header into an identifier-safe column name.
fn clean_column_name(raw: &str) -> String {
    raw.trim()
        .replace(' ', "_")
        .replace('-', "_")
        .replace(['(', ')'], "")
}

/// Infers a column's affinity from its values.
///
/// Any empty value forces TEXT so missing data survives a round trip.
fn infer_column_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut saw_value = false;
    let mut all_integers = true;
    let mut all_floats = true;

    for value in values {
        if value.is_empty() {
            return ColumnType::Text;
        }
        saw_value = true;
        if value.parse::<i64>().is_err() {
            all_integers = false;
        }
        if value.parse::<f64>().is_err() {
            return ColumnType::Text;
        }
    }

    if !saw_value {
        ColumnType::Text
    } else if all_integers {
        ColumnType::Integer
    } else if all_floats {
        ColumnType::Real
    } else {
        ColumnType::Text
    }
}

fn build_create_table(table: &str, headers: &[String], types: &[ColumnType]) -> String {
    let columns: Vec<String> = headers
        .iter()
        .zip(types)
        .map(|(name, column_type)| format!(r#""{}" {}"#, name, column_type.as_sql()))
        .collect();
    format!(r#"CREATE TABLE "{}" ({})"#, table, columns.join(", "))
}

fn bind_typed<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &str,
    column_type: ColumnType,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match column_type {
        ColumnType::Integer => match value.parse::<i64>() {
            Ok(n) => query.bind(n),
            Err(_) => query.bind(value.to_string()),
        },
        ColumnType::Real => match value.parse::<f64>() {
            Ok(x) => query.bind(x),
            Err(_) => query.bind(value.to_string()),
        },
        ColumnType::Text => query.bind(value.to_string()),
    }
}
