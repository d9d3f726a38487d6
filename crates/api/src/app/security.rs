//! Security response headers and CORS.

use axum::{
    Router,
    http::{HeaderName, HeaderValue},
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
};

use crate::app::errors::ApiError;
use crate::config::{CorsOptions, CorsOrigins};

/// CSP permitting the reference UI's CDN bundle.
const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; base-uri 'self'; \
    font-src 'self' https: data:; form-action 'self'; frame-ancestors 'self'; \
    img-src 'self' data: https:; object-src 'none'; \
    script-src 'self' 'unsafe-inline' https://cdn.jsdelivr.net; script-src-attr 'none'; \
    style-src 'self' https: 'unsafe-inline'; connect-src 'self'; upgrade-insecure-requests";

/// Headers added to every response that does not already set them.
pub fn security_headers() -> Vec<(HeaderName, HeaderValue)> {
    [
        ("content-security-policy", CONTENT_SECURITY_POLICY),
        ("cross-origin-opener-policy", "same-origin"),
        ("cross-origin-resource-policy", "same-origin"),
        ("origin-agent-cluster", "?1"),
        ("referrer-policy", "no-referrer"),
        ("strict-transport-security", "max-age=15552000; includeSubDomains"),
        ("x-content-type-options", "nosniff"),
        ("x-dns-prefetch-control", "off"),
        ("x-download-options", "noopen"),
        ("x-frame-options", "SAMEORIGIN"),
        ("x-permitted-cross-domain-policies", "none"),
        ("x-xss-protection", "0"),
    ]
    .into_iter()
    .map(|(name, value)| (HeaderName::from_static(name), HeaderValue::from_static(value)))
    .collect()
}

pub fn apply_security_headers(mut router: Router) -> Router {
    for (name, value) in security_headers() {
        router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }
    router
}

/// Build the CORS layer.
///
/// `Any` with credentials mirrors the request origin: browsers refuse a
/// literal `*` on credentialed requests.
pub fn cors_layer(options: &CorsOptions) -> Result<CorsLayer, ApiError> {
    let mut layer = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    layer = match &options.origins {
        CorsOrigins::Any if options.credentials => layer.allow_origin(AllowOrigin::mirror_request()),
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(origins) if origins.iter().any(|origin| origin == "*") => {
            return Err(ApiError::Config(
                "CORS origin `*` is not allowed in an origin list; use `CorsOrigins::Any`".to_string(),
            ));
        }
        CorsOrigins::List(origins) => {
            let origins = origins
                .iter()
                .map(|origin| {
                    HeaderValue::from_str(origin)
                        .map_err(|_| ApiError::Config(format!("invalid CORS origin `{origin}`")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            layer.allow_origin(AllowOrigin::list(origins))
        }
    };

    if options.credentials {
        layer = layer.allow_credentials(true);
    }
    Ok(layer)
}
