use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use queryapi_db::DbError;

/// An HTTP error answered as `{"statusCode", "error", "message"}`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Error whose message is the status' reason phrase.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or("Error"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        json_error(self.status, self.message)
    }
}

impl From<DbError> for HttpError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotConfigured(_) => Self::not_implemented(err.to_string()),
            DbError::InvalidParam(msg) => Self::bad_request(msg),
            DbError::Connection(msg) => {
                tracing::error!(error = %msg, "database unavailable");
                Self::service_unavailable("database unavailable")
            }
            DbError::Query(msg) => {
                tracing::error!(error = %msg, "query failed");
                Self::from_status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "statusCode": status.as_u16(),
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Failures while assembling or starting the API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: Method, path: String },

    #[error("route {path} conflicts with {existing}: placeholder names differ")]
    ConflictingRoute { path: String, existing: String },

    #[error("invalid route path `{0}`: paths must start with `/`")]
    InvalidPath(String),

    #[error("route {0} requires authentication but JWT is not configured")]
    AuthNotConfigured(String),

    #[error("method {0} is not supported here")]
    UnsupportedMethod(Method),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to serialize the OpenAPI document: {0}")]
    Docs(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
