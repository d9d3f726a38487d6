//! Per-request input and how SQL parameters are derived from it.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
};
use serde_json::Value;

use queryapi_auth::TokenClaims;
use queryapi_db::SqlParam;

use crate::app::errors::HttpError;
use crate::context::AuthContext;

/// What a request offers for parameter derivation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInput {
    pub path: HashMap<String, String>,
    pub query: HashMap<String, String>,
    /// Parsed JSON body; `None` when the body is empty.
    pub body: Option<Value>,
    /// Present on authenticated routes.
    pub claims: Option<TokenClaims>,
}

impl RequestInput {
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path.get(name).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn body_field(&self, name: &str) -> Option<&Value> {
        self.body.as_ref()?.get(name)
    }
}

impl<S> FromRequest<S> for RequestInput
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        // Routes without placeholders carry no path params.
        let path = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, state).await {
            Ok(Path(path)) => path,
            Err(_) => HashMap::new(),
        };

        let Query(query) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|e| HttpError::bad_request(e.body_text()))?;

        let claims = parts
            .extensions
            .get::<AuthContext>()
            .map(|ctx| ctx.claims().clone());

        let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|e| HttpError::new(e.status(), e.body_text()))?;

        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| HttpError::bad_request(format!("body is not valid JSON: {e}")))?;
            Some(value)
        };

        Ok(Self {
            path,
            query,
            body,
            claims,
        })
    }
}

type DeriveFn = dyn Fn(&RequestInput) -> Result<Vec<SqlParam>, HttpError> + Send + Sync;

/// Where a route's positional SQL parameters come from.
#[derive(Clone)]
pub enum ParamSource {
    /// Same parameters for every request.
    Static(Vec<SqlParam>),
    /// Computed from each request.
    Derived(Arc<DeriveFn>),
}

impl ParamSource {
    pub fn none() -> Self {
        Self::Static(Vec::new())
    }

    pub fn derive<F>(f: F) -> Self
    where
        F: Fn(&RequestInput) -> Result<Vec<SqlParam>, HttpError> + Send + Sync + 'static,
    {
        Self::Derived(Arc::new(f))
    }

    /// Bind the named path parameters, in order, as strings.
    pub fn path(names: &[&str]) -> Self {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        Self::derive(move |input| {
            names
                .iter()
                .map(|name| {
                    input
                        .path_param(name)
                        .map(|v| Value::String(v.to_string()))
                        .ok_or_else(|| HttpError::bad_request(format!("missing path parameter `{name}`")))
                })
                .collect()
        })
    }

    pub fn resolve(&self, input: &RequestInput) -> Result<Vec<SqlParam>, HttpError> {
        match self {
            Self::Static(params) => Ok(params.clone()),
            Self::Derived(f) => f(input),
        }
    }
}

impl Default for ParamSource {
    fn default() -> Self {
        Self::none()
    }
}

impl From<Vec<SqlParam>> for ParamSource {
    fn from(params: Vec<SqlParam>) -> Self {
        Self::Static(params)
    }
}

impl core::fmt::Debug for ParamSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Static(params) => f.debug_tuple("Static").field(params).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}
