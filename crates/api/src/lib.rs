//! HTTP API: a query-bound router with CORS, security headers, JWT and OpenAPI docs pre-wired.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;

pub use app::QueryApi;
pub use app::errors::{ApiError, HttpError};
pub use app::params::{ParamSource, RequestInput};
pub use app::route::RouteOptions;
pub use config::{ApiInfo, ApiOptions, CorsOptions, CorsOrigins, ServerConfig};
pub use context::AuthContext;
