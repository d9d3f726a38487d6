use std::sync::Arc;

use anyhow::Context;
use axum::http::Method;
use serde_json::json;

use queryapi_api::{ApiInfo, ApiOptions, ParamSource, QueryApi, RouteOptions, ServerConfig};
use queryapi_db::{PgExecutor, QueryExecutor, StaticExecutor, WriteSummary};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    queryapi_observability::init();

    let config = ServerConfig::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let executor: Arc<dyn QueryExecutor> = match &config.database_url {
        Some(url) => Arc::new(
            PgExecutor::connect(url, 10)
                .await
                .context("failed to connect to DATABASE_URL")?,
        ),
        None => {
            tracing::warn!("DATABASE_URL not set; serving canned rows");
            Arc::new(StaticExecutor::from_json(
                [json!({ "id": 1, "name": "test" })],
                WriteSummary { insert_id: 1, affected_rows: 1, changed_rows: 1 },
            ))
        }
    };

    let mut options = ApiOptions::new(ApiInfo::new("Query API", env!("CARGO_PKG_VERSION")))
        .tag("users", "User queries")
        .jwt_secret(config.jwt_secret.clone());
    if let Some(path) = &config.doc_path {
        options = options.doc_path(path.clone());
    }

    let mut api = QueryApi::new(options)?.with_shared_executor(executor);

    api.add_select_route(
        "/users",
        RouteOptions::new().summary("List users").tag("users"),
        "SELECT id, name FROM users ORDER BY id",
        ParamSource::none(),
    )?
    .add_select_route(
        "/users/:id",
        RouteOptions::new().summary("Fetch one user").tag("users"),
        "SELECT id, name FROM users WHERE id = $1::int",
        ParamSource::path(&["id"]),
    )?
    .add_select_route(
        "/me",
        RouteOptions::new().summary("Current user").tag("users").authenticated(),
        "SELECT id, name FROM users WHERE id = $1::int",
        ParamSource::derive(|input| {
            let id = input.claims.as_ref().map(|c| c.id.clone()).unwrap_or_default();
            Ok(vec![json!(id)])
        }),
    )?
    .add_write_route(
        Method::POST,
        "/users",
        RouteOptions::new().summary("Create a user").tag("users").authenticated(),
        "INSERT INTO users (name) VALUES ($1)",
        ParamSource::derive(|input| {
            let name = input
                .body_field("name")
                .cloned()
                .ok_or_else(|| queryapi_api::HttpError::bad_request("body must contain `name`"))?;
            Ok(vec![name])
        }),
    )?;

    api.listen(&config.addr()).await?;
    Ok(())
}
