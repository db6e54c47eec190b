//! Integration tests for the question answering pipeline.
//!
//! Each test drives the full pipeline with scripted LLM completions and a
//! mock or failing store, then checks the assembled response envelope.

use async_trait::async_trait;
use std::sync::Arc;

use db_parley::error::{ParleyError, Result};
use db_parley::llm::{LlmClient, Message, MockLlmClient, SamplingParams};
use db_parley::pipeline::{Pipeline, RequestError, EXAMPLE_QUESTIONS};
use db_parley::store::{
    Catalog, ColumnDescriptor, FailingStore, MockStore, Row, TabularResult, TableInfo, Value,
};

fn products_catalog() -> Catalog {
    Catalog::new(vec![TableInfo::new(
        "products",
        vec![
            ColumnDescriptor::new("ProductID", "int"),
            ColumnDescriptor::new("ProductName", "text"),
            ColumnDescriptor::new("UnitsInStock", "int"),
        ],
    )])
}

fn low_stock_result() -> TabularResult {
    let rows: Vec<Row> = vec![
        vec![
            Value::Int(3),
            Value::Text("Aniseed Syrup".to_string()),
            Value::Int(4),
        ],
        vec![
            Value::Int(21),
            Value::Text("Sir Rodney's Scones".to_string()),
            Value::Int(3),
        ],
    ];
    TabularResult::with_data(
        vec![
            "ProductID".to_string(),
            "ProductName".to_string(),
            "UnitsInStock".to_string(),
        ],
        rows,
    )
}

#[tokio::test]
async fn test_low_stock_question_round_trips() {
    let store = Arc::new(MockStore::with_result(low_stock_result()));
    let client = Arc::new(MockLlmClient::with_script([
        "SELECT ProductID, ProductName, UnitsInStock FROM products WHERE UnitsInStock < 5",
        "Two products are running low: Aniseed Syrup and Sir Rodney's Scones.",
    ]));
    let pipeline = Pipeline::new(products_catalog(), store.clone(), client.clone());

    let envelope = pipeline
        .answer_question("Show products that are low in stock")
        .await
        .unwrap();

    assert_eq!(envelope.question, "Show products that are low in stock");
    assert_eq!(
        envelope.sql_query,
        "SELECT ProductID, ProductName, UnitsInStock FROM products WHERE UnitsInStock < 5"
    );
    assert!(envelope.response.contains("Aniseed Syrup"));
    assert_eq!(envelope.total_rows, 2);
    assert_eq!(envelope.data.len(), 2);
    assert_eq!(
        envelope.columns,
        vec!["ProductID", "ProductName", "UnitsInStock"]
    );
    assert_eq!(store.query_count(), 1);
    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn test_empty_question_is_rejected_without_llm_calls() {
    let store = Arc::new(MockStore::new());
    let client = Arc::new(MockLlmClient::new());
    let pipeline = Pipeline::new(products_catalog(), store.clone(), client.clone());

    for question in ["", "   "] {
        let error = pipeline.answer_question(question).await.unwrap_err();
        assert_eq!(error, RequestError::new("Please provide a question"));
    }

    assert_eq!(client.call_count(), 0);
    assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn test_fenced_sql_is_stripped_before_execution() {
    let store = Arc::new(MockStore::with_result(low_stock_result()));
    let client = Arc::new(MockLlmClient::with_script([
        "```sql\nSELECT * FROM orders LIMIT 5\n```",
        "Here are the latest orders.",
    ]));
    let pipeline = Pipeline::new(products_catalog(), store.clone(), client);

    let envelope = pipeline.answer_question("Show recent orders").await.unwrap();

    assert_eq!(envelope.sql_query, "SELECT * FROM orders LIMIT 5");
    assert_eq!(store.queries(), vec!["SELECT * FROM orders LIMIT 5"]);
}

#[tokio::test]
async fn test_sql_failure_short_circuits_with_a_stage_prefix() {
    let store = Arc::new(MockStore::new());
    let client = Arc::new(MockLlmClient::failing("Rate limited. Please wait and try again."));
    let pipeline = Pipeline::new(products_catalog(), store.clone(), client);

    let error = pipeline.answer_question("Count the orders").await.unwrap_err();

    assert_eq!(
        error.message,
        "Error generating query: Rate limited. Please wait and try again."
    );
    assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn test_mutating_sql_is_rejected_before_the_store() {
    let store = Arc::new(MockStore::new());
    let client = Arc::new(MockLlmClient::with_script([
        "DELETE FROM products WHERE UnitsInStock = 0",
    ]));
    let pipeline = Pipeline::new(products_catalog(), store.clone(), client.clone());

    let envelope = pipeline
        .answer_question("Remove out of stock products")
        .await
        .unwrap();

    assert_eq!(
        envelope.response,
        "I encountered an error: Only SELECT queries are allowed"
    );
    assert_eq!(envelope.total_rows, 0);
    assert!(envelope.data.is_empty());
    assert!(envelope.columns.is_empty());
    assert_eq!(store.query_count(), 0);
    // Only the SQL stage ran; the error answer needs no LLM call
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_store_failure_reaches_the_response() {
    let store = Arc::new(FailingStore::new("no such table: orders"));
    let client = Arc::new(MockLlmClient::with_script(["SELECT * FROM orders"]));
    let pipeline = Pipeline::new(products_catalog(), store, client);

    let envelope = pipeline.answer_question("Show all orders").await.unwrap();

    assert_eq!(
        envelope.response,
        "I encountered an error: no such table: orders"
    );
    assert_eq!(envelope.sql_query, "SELECT * FROM orders");
    assert_eq!(envelope.total_rows, 0);
}

#[tokio::test]
async fn test_empty_results_render_as_no_data_found() {
    let store = Arc::new(MockStore::with_result(TabularResult::with_data(
        vec!["ProductID".to_string()],
        vec![],
    )));
    let client = Arc::new(MockLlmClient::with_script([
        "SELECT ProductID FROM products WHERE UnitsInStock < 0",
        "No products matched.",
    ]));
    let pipeline = Pipeline::new(products_catalog(), store, client.clone());

    let envelope = pipeline
        .answer_question("Which products have negative stock?")
        .await
        .unwrap();

    assert_eq!(envelope.response, "No products matched.");
    assert_eq!(envelope.total_rows, 0);

    let answer_prompt = &client.prompts()[1];
    assert!(answer_prompt.contains("No data found"));
    assert!(!answer_prompt.contains("Sample data"));
}

#[tokio::test]
async fn test_envelope_preview_is_capped_at_ten_rows() {
    let rows: Vec<Row> = (1..=12).map(|n| vec![Value::Int(n)]).collect();
    let store = Arc::new(MockStore::with_result(TabularResult::with_data(
        vec!["OrderID".to_string()],
        rows,
    )));
    let client = Arc::new(MockLlmClient::with_script([
        "SELECT OrderID FROM orders",
        "There are twelve orders.",
    ]));
    let pipeline = Pipeline::new(products_catalog(), store, client.clone());

    let envelope = pipeline.answer_question("List the orders").await.unwrap();

    assert_eq!(envelope.total_rows, 12);
    assert_eq!(envelope.data.len(), 10);
    assert_eq!(envelope.data[9], vec![Value::Int(10)]);

    // The answer prompt quotes even fewer rows
    let answer_prompt = &client.prompts()[1];
    assert!(answer_prompt.contains("Row 5:"));
    assert!(!answer_prompt.contains("Row 6:"));
}

#[tokio::test]
async fn test_answer_failure_short_circuits_with_a_stage_prefix() {
    let store = Arc::new(MockStore::with_result(low_stock_result()));
    let client = Arc::new(
        MockLlmClient::with_script(["SELECT * FROM products"]).then_fail("rate limited"),
    );
    let pipeline = Pipeline::new(products_catalog(), store, client);

    let error = pipeline.answer_question("List products").await.unwrap_err();

    assert_eq!(error.message, "Error generating response: rate limited");
}

struct BrokenClient;

#[async_trait]
impl LlmClient for BrokenClient {
    async fn complete(&self, _messages: &[Message], _params: &SamplingParams) -> Result<String> {
        Err(ParleyError::internal("client state corrupted"))
    }
}

#[tokio::test]
async fn test_internal_failures_are_reported_generically() {
    let store = Arc::new(MockStore::new());
    let pipeline = Pipeline::new(products_catalog(), store, Arc::new(BrokenClient));

    let error = pipeline.answer_question("Count orders").await.unwrap_err();

    assert_eq!(error.message, "An error occurred: client state corrupted");
}

#[tokio::test]
async fn test_bootstrap_discovers_the_catalog() {
    let store = Arc::new(MockStore::with_result(low_stock_result()).and_catalog(products_catalog()));
    let client = Arc::new(MockLlmClient::with_script([
        "SELECT * FROM products",
        "All products listed.",
    ]));

    let pipeline = Pipeline::bootstrap(store.clone(), client.clone()).await.unwrap();

    assert_eq!(pipeline.catalog().tables.len(), 1);

    pipeline.answer_question("List products").await.unwrap();

    let sql_prompt = &client.prompts()[0];
    assert!(sql_prompt.contains("Table: products"));
    assert!(sql_prompt.contains("  - UnitsInStock (int)"));
}

#[test]
fn test_example_questions_cover_the_dataset() {
    assert_eq!(EXAMPLE_QUESTIONS.len(), 10);
    assert_eq!(EXAMPLE_QUESTIONS[0], "List the top 10 best-selling products");
}

#[test]
fn test_request_errors_serialize_with_an_error_field() {
    let error = RequestError::new("Please provide a question");
    let json = serde_json::to_string(&error).unwrap();
    assert_eq!(json, r#"{"error":"Please provide a question"}"#);
}
