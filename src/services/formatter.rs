//! Upstream payload to buyer response mapping.
//!
//! The formatter never lets a missing or mistyped upstream field leak into
//! the delivered shape: each field is read leniently (camelCase or
//! snake_case, numbers given as strings) and falls back to a fixed default.

use serde_json::{Map, Number, Value};

use crate::domain::errors::FormatError;
use crate::domain::models::{AnalysisMetadata, FormattedResponse, ServiceKind};

/// Placeholder for absent text fields.
pub const TEXT_PLACEHOLDER: &str = "N/A";

/// Placeholder for an absent confidence label.
pub const CONFIDENCE_PLACEHOLDER: &str = "unknown";

/// Map a raw upstream payload into the response schema for `kind`.
pub fn format(kind: ServiceKind, payload: &Value) -> Result<FormattedResponse, FormatError> {
    let empty = Map::new();
    let envelope = match payload {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(FormatError::UnexpectedPayload {
                kind,
                found: json_type_name(other),
            })
        }
    };

    // Some deployments wrap the analysis in {"data": {...}, "lastRun": ...}.
    let body = match envelope.get("data") {
        Some(Value::Object(inner)) => inner,
        _ => envelope,
    };
    let view = PayloadView { body, envelope };

    let factors = kind
        .descriptor()
        .factor_fields
        .iter()
        .map(|field| (field.output, view.strings(field.sources)))
        .collect();

    Ok(FormattedResponse {
        kind,
        score: view.number(&["score"]).unwrap_or_else(|| Number::from(0)),
        analysis: view
            .text(&["analysis", "summary"])
            .unwrap_or_else(|| TEXT_PLACEHOLDER.to_string()),
        reasoning: view.strings(&["reasoning"]),
        factors,
        metadata: AnalysisMetadata {
            confidence: view
                .text(&["confidence", "confidenceLevel", "confidence_level"])
                .unwrap_or_else(|| CONFIDENCE_PLACEHOLDER.to_string()),
            certainty: view.number(&["certainty"]).unwrap_or_else(|| Number::from(0)),
            timestamp: view
                .number(&["timestamp"])
                .and_then(|n| n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)))
                .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
            last_run: view
                .text(&["lastRun", "last_run"])
                .unwrap_or_else(|| TEXT_PLACEHOLDER.to_string()),
            cache_last_update: view
                .text(&["cacheLastUpdate", "cache_last_update", "lastUpdated"])
                .unwrap_or_else(|| TEXT_PLACEHOLDER.to_string()),
        },
    })
}

/// Field lookup over the analysis body, falling back to the envelope.
struct PayloadView<'a> {
    body: &'a Map<String, Value>,
    envelope: &'a Map<String, Value>,
}

impl PayloadView<'_> {
    fn get(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .find_map(|k| self.body.get(*k).filter(|v| !v.is_null()))
            .or_else(|| {
                keys.iter()
                    .find_map(|k| self.envelope.get(*k).filter(|v| !v.is_null()))
            })
    }

    fn text(&self, keys: &[&str]) -> Option<String> {
        match self.get(keys)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn number(&self, keys: &[&str]) -> Option<Number> {
        match self.get(keys)? {
            Value::Number(n) => Some(n.clone()),
            Value::String(s) => parse_number(s.trim()),
            _ => None,
        }
    }

    /// Arrays keep their textual items; a lone string becomes one item.
    fn strings(&self, keys: &[&str]) -> Vec<String> {
        match self.get(keys) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

fn parse_number(s: &str) -> Option<Number> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::from(i));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
