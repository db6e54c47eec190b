//! Integration tests for the SQLite store.

use db_parley::error::ParleyError;
use db_parley::store::{SqliteStore, Store, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use std::path::PathBuf;
use tempfile::tempdir;

async fn seed_database() -> (PathBuf, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("business.db");

    let mut conn = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();

    for statement in [
        "CREATE TABLE products (ProductID INTEGER, ProductName TEXT, UnitPrice REAL, UnitsInStock INTEGER)",
        "CREATE TABLE categories (CategoryID INTEGER, CategoryName TEXT)",
        "INSERT INTO products VALUES (1, 'Chai', 18.0, 39)",
        "INSERT INTO products VALUES (2, 'Chang', 19.0, 17)",
        "INSERT INTO products VALUES (3, 'Aniseed Syrup', 10.0, NULL)",
    ] {
        sqlx::query(statement).execute(&mut conn).await.unwrap();
    }

    conn.close().await.unwrap();
    (path, dir)
}

async fn empty_database() -> (PathBuf, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.db");

    let conn = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();
    conn.close().await.unwrap();

    (path, dir)
}

#[tokio::test]
async fn test_discover_lists_tables_and_columns_in_order() {
    let (path, _dir) = seed_database().await;
    let store = SqliteStore::new(&path);

    let catalog = store.discover().await.unwrap();

    assert_eq!(catalog.tables.len(), 2);
    assert_eq!(catalog.tables[0].name, "categories");
    assert_eq!(catalog.tables[1].name, "products");

    let products = catalog.table("products").unwrap();
    let names: Vec<&str> = products.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["ProductID", "ProductName", "UnitPrice", "UnitsInStock"]
    );
    assert_eq!(products.columns[0].declared_type, "INTEGER");
    assert_eq!(products.columns[1].declared_type, "TEXT");
    assert_eq!(products.columns[2].declared_type, "REAL");
}

#[tokio::test]
async fn test_run_query_returns_typed_values() {
    let (path, _dir) = seed_database().await;
    let store = SqliteStore::new(&path);

    let result = store
        .run_query("SELECT ProductID, ProductName, UnitPrice FROM products ORDER BY ProductID")
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["ProductID", "ProductName", "UnitPrice"]);
    assert_eq!(result.row_count, 3);
    assert_eq!(
        result.rows[0],
        vec![
            Value::Int(1),
            Value::Text("Chai".to_string()),
            Value::Float(18.0)
        ]
    );
}

#[tokio::test]
async fn test_null_values_survive_conversion() {
    let (path, _dir) = seed_database().await;
    let store = SqliteStore::new(&path);

    let result = store
        .run_query("SELECT UnitsInStock FROM products WHERE ProductID = 3")
        .await
        .unwrap();

    assert_eq!(result.rows[0][0], Value::Null);
}

#[tokio::test]
async fn test_zero_row_select_keeps_column_names() {
    let (path, _dir) = seed_database().await;
    let store = SqliteStore::new(&path);

    let result = store
        .run_query("SELECT ProductID, ProductName FROM products WHERE 1 = 0")
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["ProductID", "ProductName"]);
    assert_eq!(result.row_count, 0);
    assert!(result.rows.is_empty());
}

#[tokio::test]
async fn test_select_one_succeeds_without_tables() {
    let (path, _dir) = empty_database().await;
    let store = SqliteStore::new(&path);

    let result = store.run_query("SELECT 1").await.unwrap();

    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0][0], Value::Int(1));
}

#[tokio::test]
async fn test_missing_table_error_carries_the_driver_message() {
    let (path, _dir) = seed_database().await;
    let store = SqliteStore::new(&path);

    let error = store
        .run_query("SELECT * FROM missing_table")
        .await
        .unwrap_err();

    assert!(error.detail().contains("no such table"));
}

#[tokio::test]
async fn test_writes_are_rejected_by_the_read_only_connection() {
    let (path, _dir) = seed_database().await;
    let store = SqliteStore::new(&path);

    let error = store
        .run_query("INSERT INTO products VALUES (4, 'Ikura', 31.0, 31)")
        .await
        .unwrap_err();

    assert!(error.detail().to_lowercase().contains("readonly"));
}

#[tokio::test]
async fn test_discover_fails_when_the_file_is_missing() {
    let dir = tempdir().unwrap();
    let store = SqliteStore::new(dir.path().join("missing.db"));

    let error = store.discover().await.unwrap_err();

    assert!(matches!(error, ParleyError::StoreUnavailable(_)));
}
