use axum::{
    Json,
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
};

use crate::app::errors::HttpError;

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Query API" }))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn not_found(method: Method, uri: Uri) -> HttpError {
    HttpError::not_found(format!("Route {method}:{} not found", uri.path()))
}
