//! Service classification.
//!
//! Buyers describe what they want in free text or in a loosely structured
//! object. Classification is total: anything that cannot be attributed to a
//! specific kind resolves to [`ServiceKind::PRIMARY`], because a job that
//! reaches the delivery phase has no way to be rejected.

use serde_json::{Map, Value};

use crate::domain::models::{ServiceKind, REGISTRY};

/// Keys that may carry an explicit service name, in lookup order.
const NAME_FIELDS: &[&str] = &["serviceName", "service_name", "service", "name"];

/// Keys that may carry a free-text description, in lookup order.
const MESSAGE_FIELDS: &[&str] = &["message", "description", "requirement", "prompt"];

/// Map a service requirement to a service kind.
pub fn classify(requirement: Option<&Value>) -> ServiceKind {
    let matched = match requirement {
        Some(Value::String(text)) => classify_text_or_json(text),
        Some(Value::Object(fields)) => classify_object(fields),
        _ => None,
    };
    matched.unwrap_or(ServiceKind::PRIMARY)
}

/// Free text may itself be a serialized object. Keywords anywhere in the
/// raw text still count when its fields say nothing.
fn classify_text_or_json(text: &str) -> Option<ServiceKind> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') {
        if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(trimmed) {
            if let Some(kind) = classify_object(&fields) {
                return Some(kind);
            }
        }
    }
    match_keywords(text)
}

/// Structured name first, then keywords in a message field.
fn classify_object(fields: &Map<String, Value>) -> Option<ServiceKind> {
    first_string(fields, NAME_FIELDS)
        .and_then(ServiceKind::from_canonical_name)
        .or_else(|| first_string(fields, MESSAGE_FIELDS).and_then(match_keywords))
}

fn first_string<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_str))
}

/// First registry entry whose keyword rule matches, if any.
fn match_keywords(text: &str) -> Option<ServiceKind> {
    let lowered = text.to_lowercase();
    REGISTRY
        .iter()
        .find(|d| d.keywords.matches(&lowered))
        .map(|d| d.kind)
}
