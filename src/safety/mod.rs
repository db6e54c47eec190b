//! Query safety checks.
//!
//! The gate is a case-insensitive substring match against a fixed keyword
//! denylist, applied before any query reaches the store. The parse-level
//! audit alongside it classifies candidate queries for logging only.

mod audit;

pub use audit::{audit_sql, SqlAudit};

/// Keywords whose presence anywhere in the query text marks it as mutating.
pub const MUTATING_KEYWORDS: [&str; 5] = ["DROP", "DELETE", "UPDATE", "INSERT", "ALTER"];

/// Returns true if the query text contains any denylisted keyword.
///
/// This is a lexical check, not a parser. It over-rejects queries that
/// merely mention a keyword (a column named `updated_at`, a string literal
/// containing "insert") and does not recognize write statements outside the
/// denylist (TRUNCATE, CREATE, REPLACE). The read-only store connection is
/// the backstop for anything that slips through.
pub fn is_mutating(sql: &str) -> bool {
    let upper = sql.to_uppercase();
    MUTATING_KEYWORDS
        .iter()
        .any(|keyword| upper.contains(keyword))
}
