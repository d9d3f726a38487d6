//! Per-route options and path handling.

use crate::app::errors::ApiError;

/// Options accepted by every route registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// Put the JWT check in front of the route.
    pub authenticate: bool,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub operation_id: Option<String>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authenticated(mut self) -> Self {
        self.authenticate = true;
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }
}

/// Validate a route path and rewrite `:name` segments to `{name}`.
///
/// Placeholders must span a whole segment and carry a name; a `{*name}`
/// catch-all is only allowed as the last segment.
pub(crate) fn normalize_path(path: &str) -> Result<String, ApiError> {
    if !path.starts_with('/') {
        return Err(ApiError::InvalidPath(path.to_string()));
    }

    let segments = path.split('/').collect::<Vec<_>>();
    let last = segments.len() - 1;
    let mut normalized = Vec::with_capacity(segments.len());
    for (i, segment) in segments.into_iter().enumerate() {
        let segment = match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        };
        if !valid_segment(&segment, i == last) {
            return Err(ApiError::InvalidPath(path.to_string()));
        }
        normalized.push(segment);
    }
    Ok(normalized.join("/"))
}

fn valid_segment(segment: &str, is_last: bool) -> bool {
    if segment.starts_with('*') {
        return false;
    }
    match segment.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
        Some(name) => {
            let (name, catch_all) = match name.strip_prefix('*') {
                Some(name) => (name, true),
                None => (name, false),
            };
            !name.is_empty() && !name.contains(['{', '}', ':', '*']) && (is_last || !catch_all)
        }
        None => !segment.contains(['{', '}']),
    }
}

/// Names of the `{name}` / `{*name}` placeholders of a normalized path.
pub(crate) fn path_params(path: &str) -> Vec<&str> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| name.trim_start_matches('*'))
        .collect()
}

/// Path with placeholder names erased; paths of equal shape share one router node.
pub(crate) fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix('{') {
            Some(rest) if rest.starts_with('*') => "{*}",
            Some(_) => "{}",
            None => segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}
