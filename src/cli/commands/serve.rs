use anyhow::{Context, Result};
use std::path::Path;

use crate::application::AgentRuntime;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::LoggerImpl;

/// Run the seller agent until shutdown.
pub async fn execute(config_path: Option<&Path>) -> Result<()> {
    let config = ConfigLoader::load_with_override(config_path)?;
    let _logger = LoggerImpl::init(&config.logging).context("Failed to initialize logging")?;

    tracing::debug!(config = ?config, "configuration loaded");

    AgentRuntime::build(config)?.run().await
}
