//! Buyer-facing response contracts.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Number;

use super::service_kind::ServiceKind;

/// Provenance block attached to every analysis response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub confidence: String,
    pub certainty: Number,
    /// Epoch milliseconds of the analysis run.
    pub timestamp: i64,
    pub last_run: String,
    pub cache_last_update: String,
}

/// Fully-shaped analysis delivered to a buyer.
///
/// The common fields are fixed; `factors` carries the kind-specific list
/// fields in registry order (e.g. `market_indicators` and `risk_factors`
/// for a black swan analysis). Serialization emits them between
/// `reasoning` and `metadata`.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedResponse {
    pub kind: ServiceKind,
    /// Kept as a JSON number so integral upstream scores stay integral.
    pub score: Number,
    pub analysis: String,
    pub reasoning: Vec<String>,
    pub factors: Vec<(&'static str, Vec<String>)>,
    pub metadata: AnalysisMetadata,
}

impl FormattedResponse {
    pub fn service_type(&self) -> &'static str {
        self.kind.name()
    }

    /// Kind-specific list field by its output key.
    pub fn factor(&self, key: &str) -> Option<&[String]> {
        self.factors
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_slice())
    }
}

impl Serialize for FormattedResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5 + self.factors.len()))?;
        map.serialize_entry("service_type", self.service_type())?;
        map.serialize_entry("score", &self.score)?;
        map.serialize_entry("analysis", &self.analysis)?;
        map.serialize_entry("reasoning", &self.reasoning)?;
        for (key, values) in &self.factors {
            map.serialize_entry(key, values)?;
        }
        map.serialize_entry("metadata", &self.metadata)?;
        map.end()
    }
}

/// Terminal response sent when an analysis could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDelivery {
    pub service_type: String,
    pub error: bool,
    pub message: String,
    /// ISO-8601 time the error was produced.
    pub timestamp: String,
}

impl ErrorDelivery {
    pub fn new(kind: ServiceKind, message: impl Into<String>) -> Self {
        Self {
            service_type: kind.name().to_string(),
            error: true,
            message: message.into(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

/// Payload handed to the protocol's deliver call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliverable {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl Deliverable {
    /// A text deliverable carrying `value` serialized as JSON.
    pub fn json_text<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: "text".to_string(),
            value: serde_json::to_string(value)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample() -> FormattedResponse {
        FormattedResponse {
            kind: ServiceKind::MarketPeak,
            score: Number::from_f64(12.5).unwrap(),
            analysis: "calm".to_string(),
            reasoning: vec![],
            factors: vec![("key_factors", vec!["liquidity".to_string()])],
            metadata: AnalysisMetadata {
                confidence: "high".to_string(),
                certainty: Number::from_f64(0.9).unwrap(),
                timestamp: 1_700_000_000_000,
                last_run: "N/A".to_string(),
                cache_last_update: "N/A".to_string(),
            },
        }
    }

    #[test]
    fn test_serializes_flat_schema() {
        let json: Value = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["service_type"], "Market Peak Analysis");
        assert_eq!(json["key_factors"][0], "liquidity");
        assert_eq!(json["metadata"]["confidence"], "high");
        assert!(json.get("market_indicators").is_none());
    }

    #[test]
    fn test_error_delivery_shape() {
        let err = ErrorDelivery::new(ServiceKind::BlackSwan, "Unable to fetch");
        let json: Value = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], true);
        assert_eq!(json["service_type"], "Black Swan Analysis");
        assert!(chrono::DateTime::parse_from_rfc3339(&err.timestamp).is_ok());
    }

    #[test]
    fn test_deliverable_text_wrapping() {
        let d = Deliverable::json_text(&sample()).unwrap();
        assert_eq!(d.kind, "text");
        let inner: Value = serde_json::from_str(&d.value).unwrap();
        assert_eq!(inner["score"], 12.5);
    }
}
