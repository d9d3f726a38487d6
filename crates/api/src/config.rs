//! API options (built in code) and server configuration (read from the environment).

use utoipa::openapi::{
    schema::Components,
    tag::{Tag, TagBuilder},
};

use crate::app::errors::ApiError;

/// Default request body limit (1 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

const DEV_JWT_SECRET: &str = "dev-secret";

/// Document metadata shown in the API reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl ApiInfo {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            description: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocOptions {
    /// Path of the reference UI; the JSON document is served at `{path}/json`.
    pub path: String,
}

impl Default for DocOptions {
    fn default() -> Self {
        Self {
            path: "/doc".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsOptions {
    pub origins: CorsOrigins,
    pub credentials: bool,
}

impl Default for CorsOptions {
    fn default() -> Self {
        Self {
            origins: CorsOrigins::Any,
            credentials: true,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct JwtOptions {
    pub secret: String,
}

impl core::fmt::Debug for JwtOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JwtOptions").field("secret", &"<redacted>").finish()
    }
}

/// Everything `QueryApi::new` wires up.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub info: ApiInfo,
    /// Passed to the OpenAPI document unchanged.
    pub tags: Vec<Tag>,
    /// Passed to the OpenAPI document unchanged (a bearer scheme is added when JWT is on).
    pub components: Components,
    pub doc: DocOptions,
    pub cors: CorsOptions,
    pub security_headers: bool,
    /// JWT authentication is only registered when this is set.
    pub jwt: Option<JwtOptions>,
    pub body_limit: usize,
}

impl ApiOptions {
    pub fn new(info: ApiInfo) -> Self {
        Self {
            info,
            tags: Vec::new(),
            components: Components::new(),
            doc: DocOptions::default(),
            cors: CorsOptions::default(),
            security_headers: true,
            jwt: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn tag(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.tags.push(
            TagBuilder::new()
                .name(name)
                .description(Some(description))
                .build(),
        );
        self
    }

    pub fn components(mut self, components: Components) -> Self {
        self.components = components;
        self
    }

    pub fn doc_path(mut self, path: impl Into<String>) -> Self {
        self.doc.path = path.into();
        self
    }

    pub fn cors(mut self, cors: CorsOptions) -> Self {
        self.cors = cors;
        self
    }

    pub fn security_headers(mut self, enabled: bool) -> Self {
        self.security_headers = enabled;
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt = Some(JwtOptions {
            secret: secret.into(),
        });
        self
    }

    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

/// Process configuration for the server binary.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub database_url: Option<String>,
    pub doc_path: Option<String>,
}

impl ServerConfig {
    /// Read `HOST`, `PORT`, `JWT_SECRET`, `DATABASE_URL` and `DOC_PATH`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ApiError::Config(format!("PORT must be a port number, got `{raw}`")))?,
            None => 3000,
        };

        let jwt_secret = non_empty("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| "::".to_string()),
            port,
            jwt_secret,
            database_url: non_empty("DATABASE_URL"),
            doc_path: non_empty("DOC_PATH"),
        })
    }

    /// Socket address string, bracketing IPv6 hosts.
    pub fn addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl core::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("doc_path", &self.doc_path)
            .finish_non_exhaustive()
    }
}
