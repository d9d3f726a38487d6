//! Handlers behind query-bound routes.

use std::sync::Arc;

use axum::{Json, extract::State};

use queryapi_db::{QueryExecutor, Row, WriteSummary};

use crate::app::errors::HttpError;
use crate::app::params::{ParamSource, RequestInput};

pub mod system;

/// Router state shared by every query-bound route.
#[derive(Clone, Default)]
pub struct AppState {
    pub executor: Option<Arc<dyn QueryExecutor>>,
}

/// SQL statement bound to one route.
#[derive(Debug, Clone)]
pub struct QueryRoute {
    pub query: String,
    pub params: ParamSource,
}

pub async fn select_rows(
    State(state): State<AppState>,
    route: Arc<QueryRoute>,
    input: RequestInput,
) -> Result<Json<Vec<Row>>, HttpError> {
    let executor = state
        .executor
        .ok_or_else(|| HttpError::not_implemented("no query executor is configured"))?;

    let params = route.params.resolve(&input)?;
    let rows = executor.select(&route.query, &params).await?;

    tracing::debug!(rows = rows.len(), "select route answered");
    Ok(Json(rows))
}

pub async fn write_rows(
    State(state): State<AppState>,
    route: Arc<QueryRoute>,
    input: RequestInput,
) -> Result<Json<WriteSummary>, HttpError> {
    let executor = state
        .executor
        .ok_or_else(|| HttpError::not_implemented("no query executor is configured"))?;

    let params = route.params.resolve(&input)?;
    let summary = executor.execute(&route.query, &params).await?;

    tracing::debug!(affected_rows = summary.affected_rows, "write route answered");
    Ok(Json(summary))
}
