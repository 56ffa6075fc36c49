//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - AnalysisSource: latest analysis payloads from the upstream API
//! - ProtocolClient: accept/deliver/register calls into the protocol SDK
//!
//! The lifecycle handler only sees these traits, which keeps it testable
//! with in-memory fakes.

pub mod analysis_source;
pub mod protocol_client;

pub use analysis_source::AnalysisSource;
pub use protocol_client::{ProtocolClient, SellerRegistration};
