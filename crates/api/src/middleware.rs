use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use queryapi_auth::{JwtValidator, TokenError};

use crate::app::errors::HttpError;
use crate::context::AuthContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let token = extract_bearer(req.headers()).map_err(|e| HttpError::unauthorized(e.to_string()))?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        HttpError::unauthorized(e.to_string())
    })?;

    req.extensions_mut().insert(AuthContext::new(claims));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, TokenError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(TokenError::MissingHeader)?;

    let header = header.to_str().map_err(|_| TokenError::MalformedHeader)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(TokenError::MalformedHeader)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(TokenError::MalformedHeader);
    }

    Ok(token)
}
