use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::UpstreamError;
use crate::domain::models::{ServiceKind, UpstreamConfig};
use crate::domain::ports::AnalysisSource;

/// Configuration for the upstream analysis client
#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    /// Base URL of the analysis API, without trailing slash
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// Endpoint path per service kind
    pub endpoints: HashMap<ServiceKind, String>,
}

impl From<&UpstreamConfig> for UpstreamClientConfig {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            endpoints: ServiceKind::all()
                .map(|kind| (kind, config.endpoint_for(kind).to_string()))
                .collect(),
        }
    }
}

/// HTTP client for the upstream analysis API
///
/// Issues one `GET {base_url}{endpoint}` per fetch. Retries and the job
/// deadline are the caller's concern.
pub struct UpstreamClient {
    http_client: ReqwestClient,
    config: UpstreamClientConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamClientConfig) -> Result<Self, UpstreamError> {
        info!(
            base_url = %config.base_url,
            timeout_secs = config.timeout.as_secs(),
            "Initializing upstream analysis client"
        );

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http_client = ReqwestClient::builder()
            .pool_max_idle_per_host(10)
            .timeout(config.timeout)
            .tcp_nodelay(true)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        Self::new(UpstreamClientConfig::from(config))
    }

    /// Full URL queried for `kind`
    pub fn url_for(&self, kind: ServiceKind) -> String {
        let endpoint = self
            .config
            .endpoints
            .get(&kind)
            .map_or_else(|| kind.default_endpoint(), String::as_str);
        format!("{}{}", self.config.base_url, endpoint)
    }

    async fn handle_response(&self, response: Response) -> Result<Value, UpstreamError> {
        let status = response.status();
        debug!(status = %status, "upstream response");

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            warn!(status = %status, body = %truncate(&body, 200), "upstream error response");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.classify_transport_error(&e))?;

        serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    fn classify_transport_error(&self, err: &reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.config.timeout)
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl AnalysisSource for UpstreamClient {
    #[instrument(skip(self), fields(service = %kind))]
    async fn fetch(&self, kind: ServiceKind) -> Result<Value, UpstreamError> {
        let url = self.url_for(kind);
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(&e))?;

        self.handle_response(response).await
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
