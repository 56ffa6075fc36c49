use serde_json::Value;

use crate::domain::models::ServiceKind;
use crate::services::classify;

/// Classify a requirement given on the command line.
///
/// Input that parses as JSON is classified as structured; anything else is
/// treated as free text.
pub fn execute(requirement: &str) -> ServiceKind {
    let value = serde_json::from_str::<Value>(requirement)
        .unwrap_or_else(|_| Value::String(requirement.to_string()));
    let kind = classify(Some(&value));
    println!("{} ({})", kind.name(), kind.slug());
    kind
}
