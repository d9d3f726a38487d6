//! In-memory executor (dev/test): fixed results, every call recorded.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::executor::{DbResult, QueryExecutor};
use crate::sql::{Row, SqlParam, SqlType, WriteSummary};

/// A query as received by [`StaticExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub kind: SqlType,
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Executor answering every select with the same rows and every write with
/// the same summary.
#[derive(Debug, Default)]
pub struct StaticExecutor {
    rows: Vec<Row>,
    summary: WriteSummary,
    calls: Mutex<Vec<RecordedQuery>>,
}

impl StaticExecutor {
    pub fn new(rows: Vec<Row>, summary: WriteSummary) -> Self {
        Self {
            rows,
            summary,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Build from JSON objects; non-object values are skipped.
    pub fn from_json(rows: impl IntoIterator<Item = serde_json::Value>, summary: WriteSummary) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        Self::new(rows, summary)
    }

    /// Every query received so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedQuery> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, kind: SqlType, query: &str, params: &[SqlParam]) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedQuery {
                kind,
                query: query.to_string(),
                params: params.to_vec(),
            });
    }
}

#[async_trait]
impl QueryExecutor for StaticExecutor {
    async fn select(&self, query: &str, params: &[SqlParam]) -> DbResult<Vec<Row>> {
        self.record(SqlType::Select, query, params);
        Ok(self.rows.clone())
    }

    async fn execute(&self, query: &str, params: &[SqlParam]) -> DbResult<WriteSummary> {
        let kind = SqlType::detect(query)
            .filter(|k| k.is_write())
            .unwrap_or(SqlType::Insert);
        self.record(kind, query, params);
        Ok(self.summary)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn returns_fixed_results_and_records_calls() {
        let executor = StaticExecutor::from_json(
            [json!({"id": 1, "name": "test"}), json!("not a row")],
            WriteSummary { insert_id: 1, affected_rows: 1, changed_rows: 1 },
        );

        let rows = executor.select("SELECT * FROM t WHERE id = $1", &[json!(1)]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "test");

        let summary = executor.execute("UPDATE t SET name = $1", &[json!("x")]).await.unwrap();
        assert_eq!(summary.insert_id, 1);

        let calls = executor.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].kind, SqlType::Select);
        assert_eq!(calls[0].params, vec![json!(1)]);
        assert_eq!(calls[1].kind, SqlType::Update);
    }
}
