//! HTTP adapter for an ACP SDK bridge.
//!
//! The protocol SDK runs as a sidecar process that holds the wallet and
//! talks to the chain. It forwards job events to the service's `/acp/jobs`
//! webhook and exposes accept/deliver/register calls over HTTP.

use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::ProtocolError;
use crate::domain::models::{AcpConfig, AgentConfig, Deliverable, Job};
use crate::domain::ports::{ProtocolClient, SellerRegistration};

#[derive(Debug, Serialize)]
struct AcceptRequest<'a> {
    accept: bool,
    reason: &'a str,
}

#[derive(Debug, Deserialize)]
struct AcceptResponse {
    #[serde(default)]
    accepted: bool,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    #[serde(flatten)]
    registration: &'a SellerRegistration,
    #[serde(skip_serializing_if = "Option::is_none")]
    private_key: Option<&'a str>,
}

/// Client for the ACP SDK bridge
pub struct AcpBridgeClient {
    http_client: ReqwestClient,
    base_url: String,
    private_key: Option<String>,
}

impl AcpBridgeClient {
    pub fn new(acp: &AcpConfig, agent: &AgentConfig) -> Result<Self, ProtocolError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(token) = &acp.api_token {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ProtocolError::Network(format!("Invalid API token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(acp.request_timeout_secs))
            .tcp_nodelay(true)
            .default_headers(headers)
            .build()
            .map_err(|e| ProtocolError::Network(e.to_string()))?;

        info!(bridge_url = %acp.bridge_url, "Initializing ACP bridge client");

        Ok(Self {
            http_client,
            base_url: acp.bridge_url.trim_end_matches('/').to_string(),
            private_key: agent.private_key.clone(),
        })
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<Response, ProtocolError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ProtocolError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            warn!(status = %status, "bridge error response");
            return Err(ProtocolError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ProtocolClient for AcpBridgeClient {
    #[instrument(skip(self, registration), fields(wallet = %registration.wallet_address))]
    async fn register(&self, registration: &SellerRegistration) -> Result<(), ProtocolError> {
        let request = RegisterRequest {
            registration,
            private_key: self.private_key.as_deref(),
        };
        self.post("/agents/register", &request).await?;
        info!(services = ?registration.services, "registered as seller");
        Ok(())
    }

    async fn accept(&self, job: &Job, reason: &str) -> Result<bool, ProtocolError> {
        let response = self
            .post(
                &format!("/jobs/{}/accept", job.id),
                &AcceptRequest {
                    accept: true,
                    reason,
                },
            )
            .await?;

        let body: AcceptResponse = response
            .json()
            .await
            .map_err(|e| ProtocolError::Decode(e.to_string()))?;
        Ok(body.accepted)
    }

    async fn deliver(&self, job: &Job, deliverable: &Deliverable) -> Result<(), ProtocolError> {
        self.post(&format!("/jobs/{}/deliver", job.id), deliverable)
            .await?;
        Ok(())
    }
}
