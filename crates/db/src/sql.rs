//! SQL statement kinds and the result shapes they map to.

use serde::{Deserialize, Serialize};

/// Positional query parameter.
pub type SqlParam = serde_json::Value;

/// One result row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Kind of a SQL statement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    Select,
    Insert,
    Update,
    Delete,
}

impl SqlType {
    /// Classify a statement by its leading keyword.
    ///
    /// Leading whitespace and `--` line comments are skipped. Returns `None`
    /// for statements that are neither reads nor insert/update/delete.
    pub fn detect(query: &str) -> Option<Self> {
        let keyword = leading_keyword(query)?.to_ascii_lowercase();
        match keyword.as_str() {
            "select" | "with" | "show" | "values" | "explain" | "table" => Some(Self::Select),
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn is_write(self) -> bool {
        !matches!(self, Self::Select)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl core::fmt::Display for SqlType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn leading_keyword(query: &str) -> Option<&str> {
    let mut rest = query;
    loop {
        rest = rest.trim_start();
        match rest.strip_prefix("--") {
            Some(comment) => rest = comment.split_once('\n').map(|(_, tail)| tail).unwrap_or(""),
            None => break,
        }
    }
    let rest = rest.trim_start_matches('(');
    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

/// Outcome of an insert, update or delete statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteSummary {
    pub insert_id: u64,
    pub affected_rows: u64,
    pub changed_rows: u64,
}

/// Result of running a statement: rows for reads, a summary for writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    Rows(Vec<Row>),
    Write(WriteSummary),
}
