//! Mapping of HTTP failures onto the client error taxonomy.

use aura_core::AuraError;
use serde_json::Value;

/// Classifies a non-2xx response.
///
/// `reason` is the canonical status text, used when the body has no usable
/// detail.
pub fn classify_failure(status: u16, reason: Option<&str>, body: &str) -> AuraError {
    match status {
        401 => AuraError::SessionExpired,
        403 => AuraError::forbidden(detail_or_fallback(body, reason, status)),
        400..=499 => AuraError::validation(detail_or_fallback(body, reason, status)),
        _ => AuraError::Server {
            status,
            detail: detail_or_fallback(body, reason, status),
        },
    }
}

/// Classifies a transport-level failure.
pub fn classify_transport(err: &reqwest::Error) -> AuraError {
    if err.is_timeout() {
        AuraError::connectivity("request timed out")
    } else if err.is_connect() {
        AuraError::connectivity(format!("connection failed: {}", err))
    } else {
        AuraError::connectivity(err.to_string())
    }
}

fn detail_or_fallback(body: &str, reason: Option<&str>, status: u16) -> String {
    if let Some(detail) = extract_detail(body) {
        return detail;
    }
    let raw = body.trim();
    if !raw.is_empty() {
        return raw.to_string();
    }
    reason
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status))
}

/// Server-provided detail text.
///
/// Accepts `{"detail": "..."}` and FastAPI's validation form
/// `{"detail": [{"msg": "..."}, ...]}`, whose messages are joined by `"; "`.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}
