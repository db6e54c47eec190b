//! Core data types for query results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single row of data, as a vector of values.
pub type Row = Vec<Value>;

/// The full result set of one executed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    /// Column names, in selection order.
    pub columns: Vec<String>,
    /// All fetched rows. Nothing is truncated at this layer.
    pub rows: Vec<Row>,
    /// Total number of rows fetched.
    pub row_count: usize,
}

impl TabularResult {
    /// Creates an empty result with no columns or rows.
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
        }
    }

    /// Creates a result from columns and rows, computing the row count.
    pub fn with_data(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }

    /// Returns true if the result contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for TabularResult {
    fn default() -> Self {
        Self::new()
    }
}

/// A single cell value from the database.
///
/// Serializes untagged so envelope JSON carries plain scalars.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    #[default]
    Null,
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary data.
    Blob(Vec<u8>),
}

impl Value {
    /// Converts the value to a display string.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Blob(b) => format!("<{} bytes>", b.len()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(value) => value.into(),
            None => Value::Null,
        }
    }
}
