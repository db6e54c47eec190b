//! Schema catalog types.
//!
//! The catalog is the snapshot of tables and columns discovered at startup.
//! It grounds SQL generation: the prompt rendering below is the only schema
//! the LLM ever sees.

use serde::{Deserialize, Serialize};

/// The discovered schema of a store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// All base tables, ordered by name.
    pub tables: Vec<TableInfo>,
}

/// A table and its ordered column list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDescriptor>,
}

/// A column's name and declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// The type as declared in the table definition.
    pub declared_type: String,
}

impl ColumnDescriptor {
    /// Creates a column descriptor.
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }
}

impl TableInfo {
    /// Creates a table entry with its columns.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }
}

impl Catalog {
    /// Creates a catalog from a table list.
    pub fn new(tables: Vec<TableInfo>) -> Self {
        Self { tables }
    }

    /// Returns true if no tables were discovered.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Renders the catalog as the schema block embedded in LLM prompts.
    ///
    /// Each table becomes a `Table: <name>` line followed by one
    /// `  - <column> (<type>)` line per column.
    pub fn render_for_prompt(&self) -> String {
        let mut text = String::new();
        for table in &self.tables {
            text.push_str(&format!("\nTable: {}\n", table.name));
            for column in &table.columns {
                text.push_str(&format!(
                    "  - {} ({})\n",
                    column.name, column.declared_type
                ));
            }
        }
        text
    }
}
