use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Incoming API Gateway event. Both HTTP API (v2) and REST API (v1) payloads
/// deserialize into this; every field is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitEvent {
    #[serde(default)]
    pub http_method: Option<String>, // v1 only
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub request_context: Option<RequestContext>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RequestContext {
    /// Present on HTTP API (v2) events.
    #[serde(default)]
    pub http: Option<HttpContext>,
    /// Present on REST API (v1) events.
    #[serde(default)]
    pub identity: Option<Identity>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpContext {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub source_ip: Option<String>,
}

impl VisitEvent {
    /// Case-insensitive header lookup. The lower-case key wins when the
    /// event carries several spellings, then the name as given.
    pub fn header(&self, name: &str) -> Option<&str> {
        let headers = self.headers.as_ref()?;
        headers
            .get(&name.to_ascii_lowercase())
            .or_else(|| headers.get(name))
            .or_else(|| {
                headers
                    .iter()
                    .filter(|(k, _)| k.eq_ignore_ascii_case(name))
                    .min_by(|a, b| a.0.cmp(b.0))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    /// HTTP method: v2 `requestContext.http.method`, then v1 `httpMethod`,
    /// then GET.
    pub fn method(&self) -> &str {
        let v2 = self
            .request_context
            .as_ref()
            .and_then(|c| c.http.as_ref())
            .and_then(|h| h.method.as_deref())
            .filter(|m| !m.is_empty());
        v2.or(self.http_method.as_deref()).unwrap_or("GET")
    }
}

/// One row of the visits table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorRecord {
    pub visitor_ip: String,
    pub visit_count: u64,
    pub first_visit: Option<String>,
    pub last_visit: Option<String>,
}

/// GET response body. Field order is the wire order.
#[derive(Debug, Serialize)]
pub struct VisitStats {
    pub total_visits: u64,
    pub unique_visitors: u64,
    pub visitor_ip: String,
    pub visitor_visits: u64,
    pub first_visit: Option<String>,
    pub last_visit: Option<String>,
}

/// POST response body.
#[derive(Debug, Serialize)]
pub struct VisitRegistered {
    pub message: &'static str,
    pub visitor_ip: String,
    pub visitor_visits: u64,
    pub total_visits: u64,
    pub unique_visitors: u64,
}

#[derive(Debug, Serialize)]
pub struct MessageBody<'a> {
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
