//! acp-analyst - ACP seller agent for market analyses
//!
//! Sells two analysis products on the Agent Commerce Protocol: a Black Swan
//! analysis and a Market Peak analysis. Incoming jobs are classified from the
//! buyer's requirement, negotiations are accepted, and paid jobs receive the
//! latest upstream analysis reshaped into a fixed JSON schema.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, error taxonomy and port traits
//! - **Service Layer** (`services`): Classification, formatting and the job lifecycle
//! - **Infrastructure Layer** (`infrastructure`): HTTP adapters, config, logging, monitoring
//! - **Application Layer** (`application`): Process wiring and graceful shutdown
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use acp_analyst::{AgentRuntime, ConfigLoader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     AgentRuntime::build(config)?.run().await
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::AgentRuntime;
pub use domain::errors::{FormatError, JobError, ProtocolError, UpstreamError};
pub use domain::models::{
    Config, Deliverable, ErrorDelivery, FormattedResponse, Job, JobId, JobPhase, Memo,
    ServiceKind,
};
pub use domain::ports::{AnalysisSource, ProtocolClient, SellerRegistration};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{classify, JobLifecycleHandler, JobMetrics, MetricsSnapshot};
