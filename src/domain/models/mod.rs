//! Domain models for the analyst agent.

pub mod analysis;
pub mod config;
pub mod job;
pub mod service_kind;

pub use analysis::{AnalysisMetadata, Deliverable, ErrorDelivery, FormattedResponse};
pub use config::{
    AcpConfig, AgentConfig, Config, JobsConfig, LoggingConfig, RetryConfig, ServerConfig,
    UpstreamConfig,
};
pub use job::{Job, JobId, JobPhase, Memo};
pub use service_kind::{ServiceDescriptor, ServiceKind, UnknownServiceError, REGISTRY};
