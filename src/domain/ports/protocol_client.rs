use async_trait::async_trait;
use serde::Serialize;

use crate::domain::errors::ProtocolError;
use crate::domain::models::{Deliverable, Job};

/// Seller identity announced to the protocol network
#[derive(Debug, Clone, Serialize)]
pub struct SellerRegistration {
    pub name: String,
    pub wallet_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<u64>,
    /// Canonical names of the services offered
    pub services: Vec<String>,
}

/// Port for the protocol SDK
///
/// The SDK owns negotiation, escrow and settlement. The service only answers
/// negotiations and hands over deliverables.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Register as a seller so the SDK starts forwarding job events
    async fn register(&self, registration: &SellerRegistration) -> Result<(), ProtocolError>;

    /// Accept a negotiation; returns whether the SDK recorded the acceptance
    async fn accept(&self, job: &Job, reason: &str) -> Result<bool, ProtocolError>;

    /// Deliver the terminal result of a job
    async fn deliver(&self, job: &Job, deliverable: &Deliverable) -> Result<(), ProtocolError>;
}
