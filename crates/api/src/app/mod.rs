//! `QueryApi`: an axum router pre-wired with CORS, security headers, JSON
//! errors, optional JWT authentication and OpenAPI docs, plus helpers that
//! bind routes straight to SQL statements.
//!
//! Layout:
//! - `route.rs`: per-route options and path normalisation
//! - `params.rs`: request input and SQL parameter derivation
//! - `routes/`: handlers (query-bound routes, system routes)
//! - `docs.rs`: OpenAPI document and reference UI
//! - `security.rs`: security headers and CORS
//! - `errors.rs`: consistent error responses

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Instant,
};

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    handler::Handler,
    http::Method,
    routing::{MethodFilter, MethodRouter, on},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::openapi::OpenApi;

use queryapi_auth::Hs256Jwt;
use queryapi_db::QueryExecutor;

use crate::config::ApiOptions;
use crate::middleware::{self, AuthState};

pub mod docs;
pub mod errors;
pub mod params;
pub mod route;
pub mod routes;
pub mod security;

use docs::ApiDocs;
use errors::ApiError;
use params::{ParamSource, RequestInput};
use route::{RouteOptions, normalize_path, path_params, path_shape};
use routes::{AppState, QueryRoute};

pub struct QueryApi {
    options: ApiOptions,
    router: Router<AppState>,
    docs: ApiDocs,
    executor: Option<Arc<dyn QueryExecutor>>,
    jwt: Option<Arc<Hs256Jwt>>,
    registered: HashSet<(Method, String)>,
    /// Placeholder-erased path -> path as registered.
    shapes: HashMap<String, String>,
}

impl QueryApi {
    /// Wire the framework plugins and the built-in `/` and `/health` routes.
    pub fn new(options: ApiOptions) -> Result<Self, ApiError> {
        if !options.doc.path.starts_with('/') {
            return Err(ApiError::Config(format!(
                "doc path `{}` must start with `/`",
                options.doc.path
            )));
        }
        let doc_path = normalize_path(&options.doc.path)
            .map_err(|_| ApiError::Config(format!("doc path `{}` is not a valid route", options.doc.path)))?;
        if !path_params(&doc_path).is_empty() {
            return Err(ApiError::Config(format!(
                "doc path `{doc_path}` must not contain placeholders"
            )));
        }
        if doc_path.trim_end_matches('/').is_empty() {
            return Err(ApiError::Config(
                "doc path `/` collides with the root route".to_string(),
            ));
        }

        let jwt = options.jwt.as_ref().map(|jwt| Arc::new(Hs256Jwt::new(&jwt.secret)));
        if jwt.is_some() {
            tracing::info!("jwt authentication enabled");
        }

        let docs = ApiDocs::new(&options);
        let registered = HashSet::from([
            (Method::GET, docs.ui_path().to_string()),
            (Method::GET, docs.json_path()),
        ]);
        let shapes = registered
            .iter()
            .map(|(_, path)| (path_shape(path), path.clone()))
            .collect();

        let mut api = Self {
            options,
            router: Router::new(),
            docs,
            executor: None,
            jwt,
            registered,
            shapes,
        };

        api.add_route(
            Method::GET,
            "/",
            RouteOptions::new().summary("Service banner"),
            routes::system::root,
        )?;
        api.add_route(
            Method::GET,
            "/health",
            RouteOptions::new().summary("Liveness probe"),
            routes::system::health,
        )?;

        Ok(api)
    }

    /// Install the executor that query-bound routes forward to.
    pub fn with_executor<E>(self, executor: E) -> Self
    where
        E: QueryExecutor + 'static,
    {
        self.with_shared_executor(Arc::new(executor))
    }

    pub fn with_shared_executor(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Token signer/validator, when JWT is configured.
    pub fn jwt(&self) -> Option<&Hs256Jwt> {
        self.jwt.as_deref()
    }

    pub fn openapi(&self) -> &OpenApi {
        self.docs.openapi()
    }

    /// Register an arbitrary handler.
    pub fn add_route<H, T>(
        &mut self,
        method: Method,
        path: &str,
        options: RouteOptions,
        handler: H,
    ) -> Result<&mut Self, ApiError>
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| ApiError::UnsupportedMethod(method.clone()))?;
        self.mount(method, path, options, "Successful response", on(filter, handler))
    }

    /// Register a GET route answering with the rows `query` yields.
    ///
    /// Without an executor the route answers `501 Not Implemented`.
    pub fn add_select_route(
        &mut self,
        path: &str,
        options: RouteOptions,
        query: impl Into<String>,
        params: impl Into<ParamSource>,
    ) -> Result<&mut Self, ApiError> {
        let route = Arc::new(QueryRoute {
            query: query.into(),
            params: params.into(),
        });

        let handler = move |state: State<AppState>, input: RequestInput| {
            let route = route.clone();
            async move { routes::select_rows(state, route, input).await }
        };

        self.mount(
            Method::GET,
            path,
            options,
            "Rows returned by the query",
            on(MethodFilter::GET, handler),
        )
    }

    /// Register an insert/update/delete route answering with the write summary.
    pub fn add_write_route(
        &mut self,
        method: Method,
        path: &str,
        options: RouteOptions,
        query: impl Into<String>,
        params: impl Into<ParamSource>,
    ) -> Result<&mut Self, ApiError> {
        let filter = match method {
            Method::POST => MethodFilter::POST,
            Method::PUT => MethodFilter::PUT,
            Method::PATCH => MethodFilter::PATCH,
            Method::DELETE => MethodFilter::DELETE,
            other => return Err(ApiError::UnsupportedMethod(other)),
        };

        let route = Arc::new(QueryRoute {
            query: query.into(),
            params: params.into(),
        });

        let handler = move |state: State<AppState>, input: RequestInput| {
            let route = route.clone();
            async move { routes::write_rows(state, route, input).await }
        };

        self.mount(
            method,
            path,
            options,
            "Summary of the write (insertId, affectedRows, changedRows)",
            on(filter, handler),
        )
    }

    fn mount(
        &mut self,
        method: Method,
        path: &str,
        options: RouteOptions,
        response: &str,
        mut method_router: MethodRouter<AppState>,
    ) -> Result<&mut Self, ApiError> {
        let path = normalize_path(path)?;

        if options.authenticate {
            let jwt = self
                .jwt
                .clone()
                .ok_or_else(|| ApiError::AuthNotConfigured(format!("{method} {path}")))?;
            let auth_state = AuthState { jwt };
            method_router = method_router.route_layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::auth_middleware,
            ));
        }

        let shape = path_shape(&path);
        match self.shapes.get(&shape) {
            Some(existing) if *existing != path => {
                return Err(ApiError::ConflictingRoute {
                    path,
                    existing: existing.clone(),
                });
            }
            _ => {}
        }

        if !self.registered.insert((method.clone(), path.clone())) {
            return Err(ApiError::DuplicateRoute { method, path });
        }
        self.shapes.insert(shape, path.clone());

        self.docs.document(&method, &path, &options, response);
        self.router = std::mem::take(&mut self.router).route(&path, method_router);

        tracing::debug!(%method, %path, authenticate = options.authenticate, "route registered");
        Ok(self)
    }

    /// Finish wiring: docs, fallback, body limit, security headers, CORS, tracing.
    pub fn into_router(self) -> Result<Router, ApiError> {
        let cors = security::cors_layer(&self.options.cors)?;
        let state = AppState {
            executor: self.executor,
        };

        let mut router = self
            .router
            .merge(self.docs.router::<AppState>()?)
            .fallback(routes::system::not_found)
            .layer(DefaultBodyLimit::max(self.options.body_limit))
            .with_state(state);

        if self.options.security_headers {
            router = security::apply_security_headers(router);
        }

        Ok(router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        ))
    }

    /// Bind `addr` and serve until ctrl-c.
    pub async fn listen(self, addr: &str) -> Result<(), ApiError> {
        let boot = Instant::now();
        let router = self.into_router()?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let elapsed = boot.elapsed();
        tracing::info!(
            address = %local_addr,
            "server started in {}s ({}ms)",
            elapsed.as_secs(),
            elapsed.as_millis()
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
