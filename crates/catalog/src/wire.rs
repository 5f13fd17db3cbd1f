//! Helpers for the JSON shapes catalog services speak.

use serde::Serialize;
use serde_json::Value;

/// Longest raw body excerpt carried into error messages.
const MAX_EXCERPT: usize = 200;

/// Body of `POST /add-product` (and of ingest-service requests).
#[derive(Debug, Serialize)]
pub struct LinkRequest<'a> {
    pub url: &'a str,
}

/// If `body` is an in-band error sentinel (`{"error": ...}` without product
/// fields), describe it.
///
/// Legacy deployments answer "not found" and "could not ingest" with HTTP 200
/// and such a body.
pub fn error_sentinel(body: &Value) -> Option<String> {
    let obj = body.as_object()?;
    if !obj.contains_key("error") || obj.contains_key("title") {
        return None;
    }
    Some(describe_value(body))
}

/// Human-readable summary of an error body: `message`, then `detail`, then `error`.
pub fn describe_error_body(bytes: &[u8]) -> String {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => describe_value(&value),
        Err(_) => excerpt(bytes),
    }
}

fn describe_value(value: &Value) -> String {
    ["message", "detail", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| excerpt(value.to_string().as_bytes()))
}

fn excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.is_empty() {
        return "<empty body>".to_string();
    }
    match text.char_indices().nth(MAX_EXCERPT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
