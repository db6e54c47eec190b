//! Parse-level query audit.
//!
//! Classifies candidate SQL with a real parser so gaps in the lexical gate
//! show up in logs. The audit never blocks execution.

use sqlparser::ast::Statement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

/// Outcome of auditing one candidate query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlAudit {
    /// Every statement parses as read-only.
    ReadOnly,
    /// At least one statement writes; carries the statement keyword.
    Write(String),
    /// The text did not parse as SQL; carries the parser's reason.
    Unparsed(String),
}

/// Audits a candidate query string.
pub fn audit_sql(sql: &str) -> SqlAudit {
    let statements = match Parser::parse_sql(&SQLiteDialect {}, sql) {
        Ok(statements) => statements,
        Err(e) => return SqlAudit::Unparsed(e.to_string()),
    };

    if statements.is_empty() {
        return SqlAudit::Unparsed("empty statement".to_string());
    }

    for statement in &statements {
        if let Some(keyword) = write_keyword(statement) {
            return SqlAudit::Write(keyword.to_string());
        }
    }

    SqlAudit::ReadOnly
}

/// Returns the keyword of a writing statement, or None for read-only ones.
fn write_keyword(statement: &Statement) -> Option<&'static str> {
    match statement {
        Statement::Query(_) => None,
        Statement::Explain {
            analyze, statement, ..
        } => {
            // EXPLAIN ANALYZE executes the inner statement
            if *analyze {
                write_keyword(statement)
            } else {
                None
            }
        }
        Statement::Insert(_) => Some("INSERT"),
        Statement::Update { .. } => Some("UPDATE"),
        Statement::Delete(_) => Some("DELETE"),
        Statement::Drop { .. } => Some("DROP"),
        Statement::Truncate { .. } => Some("TRUNCATE"),
        Statement::AlterTable { .. } => Some("ALTER"),
        Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. } => Some("CREATE"),
        Statement::Merge { .. } => Some("MERGE"),
        // Anything unrecognized is treated as a write
        _ => Some("NON-SELECT"),
    }
}
