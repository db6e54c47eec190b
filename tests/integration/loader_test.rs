//! Integration tests for the dataset loader.
//!
//! These load CSV text straight into temporary databases; downloads are
//! covered by `parley setup` against the live dataset.

use db_parley::loader::{create_indexes, load_csv_table};
use db_parley::store::{SqliteStore, Store, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use std::path::Path;
use tempfile::tempdir;

async fn open_writable(path: &Path) -> SqliteConnection {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_infers_column_types_from_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("load.db");
    let mut conn = open_writable(&path).await;

    let csv = "Product ID,Product Name,Unit Price,Notes (internal)\n\
               1,Chai,18.0,\n\
               2,Chang,19.5,restock\n";
    let rows = load_csv_table(&mut conn, "products", csv).await.unwrap();
    conn.close().await.unwrap();

    assert_eq!(rows, 2);

    let store = SqliteStore::new(&path);
    let catalog = store.discover().await.unwrap();
    let products = catalog.table("products").unwrap();

    let columns: Vec<(&str, &str)> = products
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.declared_type.as_str()))
        .collect();
    assert_eq!(
        columns,
        vec![
            ("Product_ID", "INTEGER"),
            ("Product_Name", "TEXT"),
            ("Unit_Price", "REAL"),
            ("Notes_internal", "TEXT"),
        ]
    );

    let result = store
        .run_query("SELECT Product_ID, Unit_Price FROM products ORDER BY Product_ID")
        .await
        .unwrap();
    assert_eq!(result.rows[0], vec![Value::Int(1), Value::Float(18.0)]);

    let notes = store
        .run_query("SELECT Notes_internal FROM products WHERE Product_ID = 1")
        .await
        .unwrap();
    assert_eq!(notes.rows[0][0], Value::Text(String::new()));
}

#[tokio::test]
async fn test_reloading_replaces_previous_contents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reload.db");
    let mut conn = open_writable(&path).await;

    let first = "ShipperID,CompanyName\n1,Speedy Express\n2,United Package\n";
    load_csv_table(&mut conn, "shippers", first).await.unwrap();

    let second = "ShipperID,CompanyName\n3,Federal Shipping\n";
    load_csv_table(&mut conn, "shippers", second).await.unwrap();
    conn.close().await.unwrap();

    let store = SqliteStore::new(&path);
    let result = store
        .run_query("SELECT CompanyName FROM shippers")
        .await
        .unwrap();

    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0][0], Value::Text("Federal Shipping".to_string()));
}

#[tokio::test]
async fn test_creates_the_join_indexes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("indexes.db");
    let mut conn = open_writable(&path).await;

    let tables = [
        ("products", "ProductID,SupplierID,CategoryID\n1,1,1\n"),
        ("orders", "OrderID,CustomerID,EmployeeID\n1,ALFKI,5\n"),
        ("order_details", "OrderID,ProductID\n1,1\n"),
        ("employee_territory", "EmployeeID,TerritoryID\n5,Eastern\n"),
    ];
    for (table, csv) in tables {
        load_csv_table(&mut conn, table, csv).await.unwrap();
    }

    create_indexes(&mut conn).await.unwrap();

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%'",
    )
    .fetch_one(&mut conn)
    .await
    .unwrap();
    conn.close().await.unwrap();

    assert_eq!(count, 7);
}

#[tokio::test]
async fn test_indexes_require_their_tables() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bare.db");
    let mut conn = open_writable(&path).await;

    let error = create_indexes(&mut conn).await.unwrap_err();

    assert!(error.detail().contains("Failed to create index"));
}
