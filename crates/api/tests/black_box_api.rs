use std::sync::Arc;

use axum::http::Method;
use chrono::{Duration as ChronoDuration, Utc};
use queryapi_api::{ApiInfo, ApiOptions, HttpError, ParamSource, QueryApi, RouteOptions};
use queryapi_auth::TokenClaims;
use queryapi_db::{SqlType, StaticExecutor, WriteSummary};
use reqwest::StatusCode;
use serde_json::json;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(api: QueryApi) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = api.into_router().expect("failed to build router");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn options() -> ApiOptions {
    ApiOptions::new(ApiInfo::new("Test API", "1.0"))
        .tag("users", "User queries")
        .jwt_secret(JWT_SECRET)
}

fn executor() -> Arc<StaticExecutor> {
    Arc::new(StaticExecutor::from_json(
        [json!({"id": 1, "name": "test"})],
        WriteSummary { insert_id: 1, affected_rows: 1, changed_rows: 1 },
    ))
}

fn mint_jwt(id: &str) -> String {
    let claims = TokenClaims::new(id, "access").expires_in(Utc::now(), ChronoDuration::minutes(10));
    queryapi_auth::Hs256Jwt::new(JWT_SECRET)
        .sign(&claims)
        .expect("failed to sign jwt")
}

/// API with the standard user routes, backed by `executor`.
fn user_api(executor: Arc<StaticExecutor>) -> QueryApi {
    let mut api = QueryApi::new(options()).unwrap().with_shared_executor(executor);
    api.add_select_route(
        "/users",
        RouteOptions::new().summary("List users").tag("users"),
        "SELECT * FROM users",
        ParamSource::none(),
    )
    .unwrap()
    .add_select_route(
        "/users/:id",
        RouteOptions::new().tag("users"),
        "SELECT * FROM users WHERE id = $1",
        ParamSource::path(&["id"]),
    )
    .unwrap()
    .add_select_route(
        "/me",
        RouteOptions::new().authenticated(),
        "SELECT * FROM users WHERE id = $1",
        ParamSource::derive(|input| {
            let claims = input
                .claims
                .as_ref()
                .ok_or_else(|| HttpError::unauthorized("missing claims"))?;
            Ok(vec![json!(claims.id)])
        }),
    )
    .unwrap()
    .add_write_route(
        Method::POST,
        "/users",
        RouteOptions::new(),
        "INSERT INTO users (name) VALUES ($1)",
        ParamSource::derive(|input| {
            let name = input
                .body_field("name")
                .cloned()
                .ok_or_else(|| HttpError::bad_request("body must contain `name`"))?;
            Ok(vec![name])
        }),
    )
    .unwrap();
    api
}

#[tokio::test]
async fn root_route_answers_banner() {
    let srv = TestServer::spawn(user_api(executor())).await;

    let res = reqwest::get(srv.url("/")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({"message": "Query API"}));

    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn select_route_returns_executor_rows() {
    let executor = executor();
    let srv = TestServer::spawn(user_api(executor.clone())).await;

    let res = reqwest::get(srv.url("/users")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!([{"id": 1, "name": "test"}]));

    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, SqlType::Select);
    assert_eq!(calls[0].query, "SELECT * FROM users");
    assert!(calls[0].params.is_empty());
}

#[tokio::test]
async fn path_parameters_are_forwarded() {
    let executor = executor();
    let srv = TestServer::spawn(user_api(executor.clone())).await;

    let res = reqwest::get(srv.url("/users/42")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(executor.calls()[0].params, vec![json!("42")]);
}

#[tokio::test]
async fn write_route_returns_summary() {
    let executor = executor();
    let srv = TestServer::spawn(user_api(executor.clone())).await;

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/users"))
        .json(&json!({"name": "ada"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({"insertId": 1, "affectedRows": 1, "changedRows": 1}));

    let calls = executor.calls();
    assert_eq!(calls[0].kind, SqlType::Insert);
    assert_eq!(calls[0].params, vec![json!("ada")]);
}

#[tokio::test]
async fn invalid_body_is_a_bad_request() {
    let srv = TestServer::spawn(user_api(executor())).await;

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/users"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.post(srv.url("/users")).json(&json!({})).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["error"], "Bad Request");
    assert_eq!(body["message"], "body must contain `name`");
}

#[tokio::test]
async fn select_without_executor_is_not_implemented() {
    let mut api = QueryApi::new(options()).unwrap();
    api.add_select_route("/users", RouteOptions::new(), "SELECT * FROM users", ParamSource::none())
        .unwrap();
    let srv = TestServer::spawn(api).await;

    let res = reqwest::get(srv.url("/users")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Not Implemented");
}

#[tokio::test]
async fn auth_required_for_protected_routes() {
    let srv = TestServer::spawn(user_api(executor())).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["statusCode"], 401);

    let res = client
        .get(srv.url("/me"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let forged = queryapi_auth::Hs256Jwt::new("other-secret")
        .sign(&TokenClaims::new("7", "access"))
        .unwrap();
    let res = client.get(srv.url("/me")).bearer_auth(forged).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn claims_reach_parameter_derivation() {
    let executor = executor();
    let srv = TestServer::spawn(user_api(executor.clone())).await;

    let res = reqwest::Client::new()
        .get(srv.url("/me"))
        .bearer_auth(mint_jwt("7"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(executor.calls()[0].params, vec![json!("7")]);
}

#[tokio::test]
async fn docs_list_registered_routes() {
    let srv = TestServer::spawn(user_api(executor())).await;

    let res = reqwest::get(srv.url("/doc/json")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let doc: serde_json::Value = res.json().await.unwrap();

    assert_eq!(doc["info"]["title"], "Test API");
    assert!(doc["paths"]["/users"]["get"].is_object());
    assert!(doc["paths"]["/users"]["post"].is_object());
    assert_eq!(doc["paths"]["/users/{id}"]["get"]["parameters"][0]["name"], "id");
    assert!(doc["paths"]["/me"]["get"]["security"].is_array());
    assert_eq!(doc["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");

    let res = reqwest::get(srv.url("/doc")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let html = res.text().await.unwrap();
    assert!(html.contains("<html"));
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let srv = TestServer::spawn(user_api(executor())).await;

    let res = reqwest::get(srv.url("/users")).await.unwrap();
    let headers = res.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(headers["referrer-policy"], "no-referrer");
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key("strict-transport-security"));
}

#[tokio::test]
async fn cors_preflight_mirrors_origin_with_credentials() {
    let srv = TestServer::spawn(user_api(executor())).await;

    let res = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, srv.url("/users"))
        .header("origin", "https://app.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();

    assert!(res.status().is_success());
    let headers = res.headers();
    assert_eq!(headers["access-control-allow-origin"], "https://app.example");
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert_eq!(headers["access-control-allow-methods"], "POST");
}

#[tokio::test]
async fn unknown_route_is_json_not_found() {
    let srv = TestServer::spawn(user_api(executor())).await;

    let res = reqwest::get(srv.url("/nope")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Route GET:/nope not found");
}

#[tokio::test]
async fn custom_routes_can_be_protected() {
    let mut api = QueryApi::new(options()).unwrap();
    api.add_route(
        Method::GET,
        "/whoami",
        RouteOptions::new().authenticated(),
        |axum::Extension(ctx): axum::Extension<queryapi_api::AuthContext>| async move {
            axum::Json(json!({ "id": ctx.user_id() }))
        },
    )
    .unwrap();
    let srv = TestServer::spawn(api).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(mint_jwt("99"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["id"], "99");
}

#[tokio::test]
async fn unregistered_method_is_not_allowed_on_protected_path() {
    let mut api = QueryApi::new(options()).unwrap().with_shared_executor(executor());
    api.add_select_route("/orders", RouteOptions::new(), "SELECT * FROM orders", ParamSource::none())
        .unwrap()
        .add_write_route(
            Method::POST,
            "/orders",
            RouteOptions::new().authenticated(),
            "INSERT INTO orders DEFAULT VALUES",
            ParamSource::none(),
        )
        .unwrap();
    let srv = TestServer::spawn(api).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/orders")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.post(srv.url("/orders")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(srv.url("/orders"))
        .bearer_auth(mint_jwt("1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.put(srv.url("/orders")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}
