//! Job model as delivered by the protocol SDK.
//!
//! The SDK owns the job; the service only holds a transient copy while an
//! event is being handled. Phases and ids arrive in whichever encoding the
//! SDK bridge uses (names or numeric indices), so deserialization accepts
//! both.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque, stable identifier of a protocol job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Ok(Self::from(n)),
            RawId::Text(s) if !s.trim().is_empty() => Ok(Self(s)),
            RawId::Text(_) => Err(serde::de::Error::custom("job id cannot be empty")),
        }
    }
}

/// Protocol phases, in lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPhase {
    Request,
    Negotiation,
    Transaction,
    Evaluation,
    Completed,
    Rejected,
    Expired,
}

impl JobPhase {
    /// Phases after which the SDK stops sending events for a job.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Expired)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "REQUEST",
            Self::Negotiation => "NEGOTIATION",
            Self::Transaction => "TRANSACTION",
            Self::Evaluation => "EVALUATION",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u64> for JobPhase {
    type Error = String;

    fn try_from(index: u64) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Self::Request),
            1 => Ok(Self::Negotiation),
            2 => Ok(Self::Transaction),
            3 => Ok(Self::Evaluation),
            4 => Ok(Self::Completed),
            5 => Ok(Self::Rejected),
            6 => Ok(Self::Expired),
            other => Err(format!("unknown job phase index: {other}")),
        }
    }
}

impl std::str::FromStr for JobPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REQUEST" => Ok(Self::Request),
            "NEGOTIATION" => Ok(Self::Negotiation),
            "TRANSACTION" => Ok(Self::Transaction),
            "EVALUATION" => Ok(Self::Evaluation),
            "COMPLETED" => Ok(Self::Completed),
            "REJECTED" => Ok(Self::Rejected),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(format!("unknown job phase: {other}")),
        }
    }
}

impl<'de> Deserialize<'de> for JobPhase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawPhase {
            Index(u64),
            Name(String),
        }

        match RawPhase::deserialize(deserializer)? {
            RawPhase::Index(i) => Self::try_from(i).map_err(serde::de::Error::custom),
            RawPhase::Name(name) => name.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Negotiation record attached to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,

    #[serde(default, alias = "next_phase", skip_serializing_if = "Option::is_none")]
    pub next_phase: Option<JobPhase>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Memo {
    pub fn with_next_phase(next_phase: JobPhase) -> Self {
        Self {
            id: None,
            next_phase: Some(next_phase),
            content: None,
        }
    }
}

/// A job lifecycle event as seen by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,

    pub phase: JobPhase,

    /// What the buyer asked for; free text or an object, possibly absent.
    #[serde(default, alias = "service_requirement", skip_serializing_if = "Option::is_none")]
    pub service_requirement: Option<serde_json::Value>,

    #[serde(default)]
    pub memos: Vec<Memo>,

    #[serde(default, alias = "client_address", skip_serializing_if = "Option::is_none")]
    pub client_address: Option<String>,

    #[serde(default, alias = "provider_address", skip_serializing_if = "Option::is_none")]
    pub provider_address: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<JobId>, phase: JobPhase) -> Self {
        Self {
            id: id.into(),
            phase,
            service_requirement: None,
            memos: Vec::new(),
            client_address: None,
            provider_address: None,
        }
    }

    #[must_use]
    pub fn with_requirement(mut self, requirement: serde_json::Value) -> Self {
        self.service_requirement = Some(requirement);
        self
    }

    #[must_use]
    pub fn with_memo(mut self, memo: Memo) -> Self {
        self.memos.push(memo);
        self
    }

    /// Whether any memo announces a transition into `phase`.
    pub fn has_memo_to(&self, phase: JobPhase) -> bool {
        self.memos.iter().any(|m| m.next_phase == Some(phase))
    }
}
