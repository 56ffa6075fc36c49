//! Service kinds offered by the agent and their registry.
//!
//! Everything that varies per kind (canonical name, upstream endpoint,
//! classification keywords, kind-specific output fields) lives in
//! [`REGISTRY`]. Classification, fetching and formatting iterate or look up
//! the registry instead of branching on the kind, so a new analysis product
//! is one more descriptor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An analysis product that buyers can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    BlackSwan,
    MarketPeak,
}

/// Keyword rule used by the classifier.
///
/// The rule matches when every keyword of at least one group occurs in the
/// lower-cased text.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub groups: &'static [&'static [&'static str]],
}

impl KeywordRule {
    pub fn matches(&self, lowered: &str) -> bool {
        self.groups
            .iter()
            .any(|group| group.iter().all(|kw| lowered.contains(kw)))
    }
}

/// A kind-specific list field of the formatted response.
#[derive(Debug, Clone, Copy)]
pub struct FactorField {
    /// Key in the delivered JSON.
    pub output: &'static str,
    /// Upstream keys consulted in order; first present wins.
    pub sources: &'static [&'static str],
}

/// Static description of one service kind.
#[derive(Debug, Clone, Copy)]
pub struct ServiceDescriptor {
    pub kind: ServiceKind,
    pub name: &'static str,
    pub slug: &'static str,
    pub endpoint: &'static str,
    pub keywords: KeywordRule,
    pub factor_fields: &'static [FactorField],
}

/// All service kinds, in classification priority order.
pub static REGISTRY: [ServiceDescriptor; 2] = [
    ServiceDescriptor {
        kind: ServiceKind::BlackSwan,
        name: "Black Swan Analysis",
        slug: "black-swan",
        endpoint: "/api/v1/black-swan/latest",
        keywords: KeywordRule {
            groups: &[&["black", "swan"]],
        },
        factor_fields: &[
            FactorField {
                output: "market_indicators",
                sources: &[
                    "currentMarketIndicators",
                    "current_market_indicators",
                    "marketIndicators",
                    "market_indicators",
                ],
            },
            FactorField {
                output: "risk_factors",
                sources: &[
                    "primaryRiskFactors",
                    "primary_risk_factors",
                    "riskFactors",
                    "risk_factors",
                ],
            },
        ],
    },
    ServiceDescriptor {
        kind: ServiceKind::MarketPeak,
        name: "Market Peak Analysis",
        slug: "market-peak",
        endpoint: "/api/v1/market-peak/latest",
        keywords: KeywordRule {
            groups: &[&["market", "peak"], &["peak"]],
        },
        factor_fields: &[FactorField {
            output: "key_factors",
            sources: &["keyFactors", "key_factors"],
        }],
    },
];

/// Error returned when a name does not identify a registered kind.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown service: {0}")]
pub struct UnknownServiceError(pub String);

impl ServiceKind {
    /// Kind used whenever a requirement is absent or ambiguous.
    pub const PRIMARY: Self = Self::BlackSwan;

    pub fn descriptor(self) -> &'static ServiceDescriptor {
        REGISTRY
            .iter()
            .find(|d| d.kind == self)
            .unwrap_or(&REGISTRY[0])
    }

    /// Canonical, buyer-facing name (the `service_type` field).
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn slug(self) -> &'static str {
        self.descriptor().slug
    }

    pub fn default_endpoint(self) -> &'static str {
        self.descriptor().endpoint
    }

    pub fn all() -> impl Iterator<Item = Self> {
        REGISTRY.iter().map(|d| d.kind)
    }

    /// Exact match on the canonical name.
    pub fn from_canonical_name(name: &str) -> Option<Self> {
        REGISTRY.iter().find(|d| d.name == name).map(|d| d.kind)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ServiceKind {
    type Err = UnknownServiceError;

    /// Accepts a slug (`black-swan`), a snake-case tag (`black_swan`) or the
    /// canonical name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        REGISTRY
            .iter()
            .find(|d| d.slug == wanted || d.name.eq_ignore_ascii_case(s.trim()))
            .map(|d| d.kind)
            .ok_or_else(|| UnknownServiceError(s.to_string()))
    }
}
