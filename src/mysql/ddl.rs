//! DDL detection on QUERY events.
//!
//! A case-insensitive regex picks `ALTER TABLE` / `CREATE TABLE` statements
//! out of the query stream and captures the bare table name; the database
//! comes from the QUERY event itself. This is a first-filter only: quoted
//! and backtick-escaped identifiers are deliberately not handled.

use regex::Regex;

/// Watches query text for schema-changing statements.
#[derive(Debug)]
pub struct DdlWatcher {
    pattern: Regex,
}

impl Default for DdlWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DdlWatcher {
    pub fn new() -> Self {
        let pattern = Regex::new(
            r"(?i)^\s*(?:alter\s+table|create\s+table(?:\s+if\s+not\s+exists)?)\s+(?:\w+\.)?(\w+)",
        )
        .expect("ddl pattern is valid");
        Self { pattern }
    }

    /// The table a DDL statement targets, if the query is one.
    pub fn altered_table<'a>(&self, query: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(query)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}
