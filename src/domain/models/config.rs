use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use super::service_kind::ServiceKind;

/// Main configuration structure for the analyst agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Seller identity on the protocol network
    #[serde(default)]
    pub agent: AgentConfig,

    /// Protocol SDK bridge connection
    #[serde(default)]
    pub acp: AcpConfig,

    /// Upstream analysis API
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Job execution limits
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Monitoring server
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Seller agent identity
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Display name announced at registration
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Agent wallet address on the network
    #[serde(default)]
    pub wallet_address: String,

    /// Session entity id issued by the protocol registry
    #[serde(default)]
    pub entity_id: Option<u64>,

    /// Whitelisted wallet private key, forwarded to the bridge at registration
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
}

fn default_agent_name() -> String {
    "acp-analyst".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            wallet_address: String::new(),
            entity_id: None,
            private_key: None,
        }
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("name", &self.name)
            .field("wallet_address", &self.wallet_address)
            .field("entity_id", &self.entity_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Protocol SDK bridge configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AcpConfig {
    /// Base URL of the SDK bridge
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Bearer token for the bridge
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,

    /// Timeout for bridge calls in seconds
    #[serde(default = "default_bridge_timeout")]
    pub request_timeout_secs: u64,

    /// Register the agent with the bridge on startup
    #[serde(default = "default_true")]
    pub register_on_start: bool,
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:8787".to_string()
}

const fn default_bridge_timeout() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

impl Default for AcpConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            api_token: None,
            request_timeout_secs: default_bridge_timeout(),
            register_on_start: true,
        }
    }
}

impl fmt::Debug for AcpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcpConfig")
            .field("bridge_url", &self.bridge_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("register_on_start", &self.register_on_start)
            .finish()
    }
}

/// Upstream analysis API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UpstreamConfig {
    /// Base URL of the analysis API
    #[serde(default = "default_upstream_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,

    /// Endpoint path overrides, keyed by service kind
    #[serde(default)]
    pub endpoints: HashMap<ServiceKind, String>,

    /// Retry policy for transient upstream failures
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

const fn default_upstream_timeout() -> u64 {
    10
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            timeout_secs: default_upstream_timeout(),
            endpoints: HashMap::new(),
            retry: RetryConfig::default(),
        }
    }
}

impl UpstreamConfig {
    /// Endpoint path for `kind`, honouring overrides.
    pub fn endpoint_for(&self, kind: ServiceKind) -> &str {
        self.endpoints
            .get(&kind)
            .map_or_else(|| kind.default_endpoint(), String::as_str)
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 disables retries)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Job execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JobsConfig {
    /// Deadline for producing a delivery, in seconds
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Maximum number of delivery pipelines running at once (1-1000)
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Number of job ids remembered for duplicate suppression
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

const fn default_deadline_secs() -> u64 {
    30
}

const fn default_max_concurrent_jobs() -> usize {
    10
}

const fn default_dedup_capacity() -> usize {
    10_000
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            deadline_secs: default_deadline_secs(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            dedup_capacity: default_dedup_capacity(),
        }
    }
}

/// Monitoring server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Time in-flight jobs get to settle on shutdown
    #[serde(default = "default_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3001
}

const fn default_grace_secs() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_grace_secs: default_grace_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
