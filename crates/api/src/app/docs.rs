//! OpenAPI document assembled from the registered routes, plus its UI.

use axum::{Json, Router, http::Method, routing::get};
use utoipa::openapi::{
    OpenApi, OpenApiBuilder,
    info::InfoBuilder,
    path::{OperationBuilder, ParameterBuilder, ParameterIn, Paths},
    response::ResponseBuilder,
    security::{HttpAuthScheme, HttpBuilder, SecurityRequirement, SecurityScheme},
    Required,
};
use utoipa_scalar::{Scalar, Servable};

use crate::app::errors::ApiError;
use crate::app::route::{RouteOptions, path_params};
use crate::config::ApiOptions;

/// Name of the bearer security scheme in `components.securitySchemes`.
pub const BEARER_SCHEME: &str = "bearerAuth";

pub struct ApiDocs {
    openapi: OpenApi,
    path: String,
}

impl ApiDocs {
    pub fn new(options: &ApiOptions) -> Self {
        let info = InfoBuilder::new()
            .title(options.info.title.clone())
            .version(options.info.version.clone())
            .description(options.info.description.clone())
            .build();

        let mut components = options.components.clone();
        if options.jwt.is_some() {
            components.add_security_scheme(
                BEARER_SCHEME,
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }

        let tags = (!options.tags.is_empty()).then(|| options.tags.clone());

        let openapi = OpenApiBuilder::new()
            .info(info)
            .paths(Paths::new())
            .components(Some(components))
            .tags(tags)
            .build();

        Self {
            openapi,
            path: options.doc.path.trim_end_matches('/').to_string(),
        }
    }

    /// Path of the reference UI.
    pub fn ui_path(&self) -> &str {
        if self.path.is_empty() { "/" } else { &self.path }
    }

    /// Path of the JSON document.
    pub fn json_path(&self) -> String {
        format!("{}/json", self.path)
    }

    pub fn openapi(&self) -> &OpenApi {
        &self.openapi
    }

    /// Add an operation for a registered route.
    pub fn document(&mut self, method: &Method, path: &str, options: &RouteOptions, response: &str) {
        let mut operation = OperationBuilder::new()
            .summary(options.summary.clone())
            .description(options.description.clone())
            .operation_id(options.operation_id.clone())
            .tags((!options.tags.is_empty()).then(|| options.tags.clone()))
            .response("200", ResponseBuilder::new().description(response).build());

        for name in path_params(path) {
            operation = operation.parameter(
                ParameterBuilder::new()
                    .name(name)
                    .parameter_in(ParameterIn::Path)
                    .required(Required::True)
                    .build(),
            );
        }

        if options.authenticate {
            operation = operation
                .security(SecurityRequirement::new(BEARER_SCHEME, Vec::<String>::new()))
                .response("401", ResponseBuilder::new().description("Unauthorized").build());
        }

        let operation = Some(operation.build());
        let item = self.openapi.paths.paths.entry(path.to_string()).or_default();
        match *method {
            Method::GET => item.get = operation,
            Method::POST => item.post = operation,
            Method::PUT => item.put = operation,
            Method::PATCH => item.patch = operation,
            Method::DELETE => item.delete = operation,
            Method::HEAD => item.head = operation,
            Method::OPTIONS => item.options = operation,
            Method::TRACE => item.trace = operation,
            _ => tracing::debug!(%method, path, "method has no OpenAPI operation slot"),
        }
    }

    /// Routes serving the JSON document and the reference UI.
    pub fn router<S>(self) -> Result<Router<S>, ApiError>
    where
        S: Clone + Send + Sync + 'static,
    {
        let document = serde_json::to_value(&self.openapi)?;
        let ui_path = self.ui_path().to_string();

        let router = Router::new()
            .route(&self.json_path(), get(move || async move { Json(document) }))
            .merge(Scalar::with_url(ui_path, self.openapi));
        Ok(router)
    }
}
