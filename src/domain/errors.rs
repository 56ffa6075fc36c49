//! Error taxonomy for job handling.
//!
//! Classification never fails, so it has no error type. Everything else
//! that can go wrong while handling a job ends up as a [`JobError`].

use std::time::Duration;
use thiserror::Error;

use super::models::ServiceKind;

/// Failure fetching an analysis from the upstream API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Whether a later attempt may succeed.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

/// Failure mapping an upstream payload into the response schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("expected a JSON object for {kind}, got {found}")]
    UnexpectedPayload { kind: ServiceKind, found: &'static str },
}

/// Failure talking to the protocol SDK.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("protocol bridge returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("protocol bridge unreachable: {0}")]
    Network(String),

    #[error("invalid protocol bridge response: {0}")]
    Decode(String),

    #[error("invalid deliverable: {0}")]
    Deliverable(String),
}

/// Errors raised while handling a single job event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("upstream unavailable for {kind}: {source}")]
    UpstreamUnavailable {
        kind: ServiceKind,
        #[source]
        source: UpstreamError,
    },

    #[error("{kind} exceeded the job deadline of {}s", .deadline.as_secs())]
    UpstreamTimeout { kind: ServiceKind, deadline: Duration },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("delivery failed: {0}")]
    DeliveryTransport(#[source] ProtocolError),

    #[error("unhandled job error: {0}")]
    Unhandled(String),
}

impl JobError {
    /// Human-readable text placed in the buyer's error delivery.
    pub fn buyer_message(&self, kind: ServiceKind) -> String {
        match self {
            Self::UpstreamUnavailable { source, .. } => {
                format!("Unable to fetch {kind} data: {source}")
            }
            Self::UpstreamTimeout { deadline, .. } => format!(
                "Unable to fetch {kind} data: analysis did not complete within {}s",
                deadline.as_secs()
            ),
            Self::Format(err) => format!("Unable to format {kind} data: {err}"),
            Self::DeliveryTransport(_) | Self::Unhandled(_) => {
                format!("Unable to complete {kind} request")
            }
        }
    }

    /// Short machine-friendly tag for logs.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::Format(_) => "format",
            Self::DeliveryTransport(_) => "delivery_transport",
            Self::Unhandled(_) => "unhandled",
        }
    }
}
