//! The executor trait and a closure-backed implementation.

use std::{future::Future, pin::Pin, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::sql::{QueryOutput, Row, SqlParam, SqlType, WriteSummary};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DbError {
    /// The executor has no implementation for this kind of statement.
    #[error("no executor configured for {0} queries")]
    NotConfigured(SqlType),

    /// A parameter could not be bound.
    #[error("invalid query parameter: {0}")]
    InvalidParam(String),

    #[error("database unavailable: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),
}

/// Runs parameterized SQL on behalf of the routes.
///
/// Both sides default to [`DbError::NotConfigured`], so an executor may
/// implement only reads or only writes.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn select(&self, _query: &str, _params: &[SqlParam]) -> DbResult<Vec<Row>> {
        Err(DbError::NotConfigured(SqlType::Select))
    }

    async fn execute(&self, query: &str, _params: &[SqlParam]) -> DbResult<WriteSummary> {
        let kind = SqlType::detect(query)
            .filter(|kind| kind.is_write())
            .unwrap_or(SqlType::Insert);
        Err(DbError::NotConfigured(kind))
    }

    /// Run a statement, choosing `select` or `execute` from its leading keyword.
    ///
    /// Statements that cannot be classified go through `execute`.
    async fn run(&self, query: &str, params: &[SqlParam]) -> DbResult<QueryOutput> {
        match SqlType::detect(query) {
            Some(SqlType::Select) => self.select(query, params).await.map(QueryOutput::Rows),
            _ => self.execute(query, params).await.map(QueryOutput::Write),
        }
    }
}

#[async_trait]
impl<E: QueryExecutor + ?Sized> QueryExecutor for Arc<E> {
    async fn select(&self, query: &str, params: &[SqlParam]) -> DbResult<Vec<Row>> {
        (**self).select(query, params).await
    }

    async fn execute(&self, query: &str, params: &[SqlParam]) -> DbResult<WriteSummary> {
        (**self).execute(query, params).await
    }

    async fn run(&self, query: &str, params: &[SqlParam]) -> DbResult<QueryOutput> {
        (**self).run(query, params).await
    }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = DbResult<T>> + Send>>;
type SelectFn = Arc<dyn Fn(String, Vec<SqlParam>) -> BoxFuture<Vec<Row>> + Send + Sync>;
type ExecuteFn = Arc<dyn Fn(String, Vec<SqlParam>) -> BoxFuture<WriteSummary> + Send + Sync>;

/// Executor assembled from async closures.
///
/// ```ignore
/// let executor = FnExecutor::new()
///     .with_select(|query, params| async move { client.select(&query, &params).await });
/// ```
#[derive(Clone, Default)]
pub struct FnExecutor {
    select: Option<SelectFn>,
    execute: Option<ExecuteFn>,
}

impl FnExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_select<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String, Vec<SqlParam>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DbResult<Vec<Row>>> + Send + 'static,
    {
        self.select = Some(Arc::new(move |query, params| Box::pin(f(query, params))));
        self
    }

    pub fn with_execute<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String, Vec<SqlParam>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DbResult<WriteSummary>> + Send + 'static,
    {
        self.execute = Some(Arc::new(move |query, params| Box::pin(f(query, params))));
        self
    }
}

impl core::fmt::Debug for FnExecutor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnExecutor")
            .field("select", &self.select.is_some())
            .field("execute", &self.execute.is_some())
            .finish()
    }
}

#[async_trait]
impl QueryExecutor for FnExecutor {
    async fn select(&self, query: &str, params: &[SqlParam]) -> DbResult<Vec<Row>> {
        match &self.select {
            Some(f) => f(query.to_string(), params.to_vec()).await,
            None => Err(DbError::NotConfigured(SqlType::Select)),
        }
    }

    async fn execute(&self, query: &str, params: &[SqlParam]) -> DbResult<WriteSummary> {
        match &self.execute {
            Some(f) => f(query.to_string(), params.to_vec()).await,
            None => Err(DbError::NotConfigured(
                SqlType::detect(query).filter(|k| k.is_write()).unwrap_or(SqlType::Insert),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(id: i64) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), json!(id));
        row
    }

    #[tokio::test]
    async fn closures_receive_query_and_params() {
        let executor = FnExecutor::new().with_select(|query, params| async move {
            assert_eq!(query, "SELECT * FROM users WHERE id = $1");
            let id = params[0].as_i64().unwrap_or_default();
            Ok(vec![row(id)])
        });

        let rows = executor
            .select("SELECT * FROM users WHERE id = $1", &[json!(5)])
            .await
            .unwrap();
        assert_eq!(rows, vec![row(5)]);
    }

    #[tokio::test]
    async fn missing_side_is_not_configured() {
        let executor = FnExecutor::new();

        assert_eq!(
            executor.select("SELECT 1", &[]).await,
            Err(DbError::NotConfigured(SqlType::Select))
        );
        assert_eq!(
            executor.execute("DELETE FROM t", &[]).await,
            Err(DbError::NotConfigured(SqlType::Delete))
        );
    }

    #[tokio::test]
    async fn run_dispatches_on_statement_kind() {
        let executor = FnExecutor::new()
            .with_select(|_, _| async { Ok(vec![row(1)]) })
            .with_execute(|_, _| async {
                Ok(WriteSummary { insert_id: 3, affected_rows: 1, changed_rows: 0 })
            });

        assert_eq!(
            executor.run("select * from t", &[]).await.unwrap(),
            QueryOutput::Rows(vec![row(1)])
        );
        assert!(matches!(
            executor.run("INSERT INTO t VALUES (1)", &[]).await.unwrap(),
            QueryOutput::Write(WriteSummary { insert_id: 3, .. })
        ));
    }

    #[tokio::test]
    async fn shared_executor_delegates() {
        let executor: Arc<dyn QueryExecutor> =
            Arc::new(FnExecutor::new().with_select(|_, _| async { Ok(vec![row(9)]) }));

        assert_eq!(executor.run("SELECT 9", &[]).await.unwrap(), QueryOutput::Rows(vec![row(9)]));
    }

    struct Scripted;

    #[async_trait]
    impl QueryExecutor for Scripted {
        async fn run(&self, _query: &str, _params: &[SqlParam]) -> DbResult<QueryOutput> {
            Ok(QueryOutput::Rows(vec![row(42)]))
        }
    }

    #[tokio::test]
    async fn shared_executor_keeps_custom_run() {
        let executor = Arc::new(Scripted);

        assert_eq!(
            executor.run("INSERT INTO t VALUES (1)", &[]).await.unwrap(),
            QueryOutput::Rows(vec![row(42)])
        );
    }
}
