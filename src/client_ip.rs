use crate::model::VisitEvent;

pub const UNKNOWN: &str = "unknown";

/// Best-effort client IP for an event. Never fails; falls back to `"unknown"`.
///
/// A gateway context block, when present, is authoritative even if it lacks
/// `sourceIp`; `x-forwarded-for` is only consulted without one.
pub fn resolve(evt: &VisitEvent) -> String {
    if let Some(ctx) = evt.request_context.as_ref() {
        if let Some(http) = ctx.http.as_ref() {
            return http.source_ip.clone().unwrap_or_else(|| UNKNOWN.into());
        }
        if let Some(identity) = ctx.identity.as_ref() {
            return identity
                .source_ip
                .clone()
                .unwrap_or_else(|| UNKNOWN.into());
        }
    }

    // First hop of the proxy chain is the original client
    if let Some(fwd) = evt.header("x-forwarded-for").filter(|v| !v.is_empty()) {
        if let Some(first) = fwd.split(',').next() {
            return first.trim().to_string();
        }
    }

    UNKNOWN.to_string()
}
