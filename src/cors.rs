use serde::Serialize;

pub const ALLOW_HEADERS: &str = "Content-Type,X-Forwarded-For";
pub const ALLOW_METHODS: &str = "GET,POST,OPTIONS";

/// Headers attached to every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorsHeaders {
    #[serde(rename = "Content-Type")]
    pub content_type: &'static str,
    #[serde(rename = "Access-Control-Allow-Origin")]
    pub allow_origin: String,
    #[serde(rename = "Access-Control-Allow-Headers")]
    pub allow_headers: &'static str,
    #[serde(rename = "Access-Control-Allow-Methods")]
    pub allow_methods: &'static str,
}

/// Ordered origin allow-list. Patterns are exact origins, `*`, or strings
/// containing `*` that match by prefix.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Value for `Access-Control-Allow-Origin`. Unmatched origins fall back
    /// to `*`, same as requests without an origin.
    pub fn allow_origin(&self, origin: &str) -> String {
        if origin.is_empty() {
            return "*".into();
        }
        if self.allowed.iter().any(|p| pattern_matches(p, origin)) {
            return origin.to_string();
        }
        tracing::debug!(origin, "origin not in allow-list");
        "*".into()
    }

    pub fn headers(&self, origin: Option<&str>) -> CorsHeaders {
        CorsHeaders {
            content_type: "application/json",
            allow_origin: self.allow_origin(origin.unwrap_or("")),
            allow_headers: ALLOW_HEADERS,
            allow_methods: ALLOW_METHODS,
        }
    }
}

fn pattern_matches(pattern: &str, origin: &str) -> bool {
    if pattern == "*" || pattern == origin {
        return true;
    }
    // e.g. "http://localhost:*"
    if pattern.contains('*') {
        return origin.starts_with(&pattern.replace('*', ""));
    }
    false
}
