//! Postgres-backed executor.
//!
//! Parameters are bound positionally (`$1`, `$2`, ...) from their JSON form and
//! result rows are decoded back to JSON by column type.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::{
    Column, Row as _, TypeInfo,
    postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, Postgres},
    query::Query,
};
use uuid::Uuid;

use crate::executor::{DbError, DbResult, QueryExecutor};
use crate::sql::{Row, SqlParam, WriteSummary};

/// Executor running statements on a SQLx Postgres pool.
///
/// Postgres has no "last insert id"; `insert_id` is always 0 and
/// `changed_rows` mirrors `affected_rows`. Use `... RETURNING id` on a
/// select route when the generated key is needed.
///
/// JSON strings and `null` are sent as `TEXT`, so comparing or inserting them
/// into other column types (int, uuid, timestamp, ...) needs an explicit cast
/// in the SQL, e.g. `WHERE id = $1::uuid`. Integers are sent as `INT8`,
/// other numbers as `FLOAT8`, arrays and objects as `JSONB`.
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        tracing::info!(max_connections, "connected to postgres");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn select(&self, query: &str, params: &[SqlParam]) -> DbResult<Vec<Row>> {
        let rows = bind_all(sqlx::query(query), params)?
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter()
            .map(row_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlx_error)
    }

    async fn execute(&self, query: &str, params: &[SqlParam]) -> DbResult<WriteSummary> {
        let result = bind_all(sqlx::query(query), params)?
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(WriteSummary {
            insert_id: 0,
            affected_rows: result.rows_affected(),
            changed_rows: result.rows_affected(),
        })
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlParam],
) -> DbResult<Query<'q, Postgres, PgArguments>> {
    for (i, param) in params.iter().enumerate() {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) if n.is_u64() => {
                let value = n
                    .as_u64()
                    .and_then(|v| i64::try_from(v).ok())
                    .ok_or_else(|| DbError::InvalidParam(format!("${}: {n} is out of range for int8", i + 1)))?;
                query.bind(value)
            }
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(v), _) => query.bind(v),
                (None, Some(v)) if v.is_finite() => query.bind(v),
                _ => return Err(DbError::InvalidParam(format!("${}: {n} is not a finite number", i + 1))),
            },
            Value::String(s) => query.bind(s.clone()),
            other => query.bind(sqlx::types::Json(other.clone())),
        };
    }
    Ok(query)
}

fn row_to_json(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let value = match type_name {
        "BOOL" => json_opt(row.try_get::<Option<bool>, _>(idx)?),
        "INT2" => json_opt(row.try_get::<Option<i16>, _>(idx)?),
        "INT4" => json_opt(row.try_get::<Option<i32>, _>(idx)?),
        "INT8" => json_opt(row.try_get::<Option<i64>, _>(idx)?),
        "FLOAT4" => json_opt(row.try_get::<Option<f32>, _>(idx)?),
        "FLOAT8" => json_opt(row.try_get::<Option<f64>, _>(idx)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => json_opt(row.try_get::<Option<String>, _>(idx)?),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx)?.unwrap_or(Value::Null),
        "UUID" => json_opt(row.try_get::<Option<Uuid>, _>(idx)?.map(|u| u.to_string())),
        "TIMESTAMPTZ" => json_opt(
            row.try_get::<Option<DateTime<Utc>>, _>(idx)?
                .map(|t| t.to_rfc3339()),
        ),
        "TIMESTAMP" => json_opt(
            row.try_get::<Option<NaiveDateTime>, _>(idx)?
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        ),
        "DATE" => json_opt(row.try_get::<Option<NaiveDate>, _>(idx)?.map(|d| d.to_string())),
        other => {
            tracing::debug!(column_type = other, "unsupported column type decoded as null");
            Value::Null
        }
    };
    Ok(value)
}

fn json_opt<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or(Value::Null)
}

fn map_sqlx_error(err: sqlx::Error) -> DbError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            DbError::Connection(err.to_string())
        }
        other => DbError::Query(other.to_string()),
    }
}
