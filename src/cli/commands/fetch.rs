use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

use crate::domain::models::ServiceKind;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::upstream::UpstreamClient;
use crate::services::{analyze, RetryPolicy};

/// Fetch one analysis and print the formatted JSON.
pub async fn execute(kind: &str, config_path: Option<&Path>) -> Result<()> {
    let kind: ServiceKind = kind.parse()?;
    let config = ConfigLoader::load_with_override(config_path)?;
    let client = UpstreamClient::from_config(&config.upstream)
        .context("Failed to create upstream analysis client")?;

    let response = analyze(
        &client,
        &RetryPolicy::from(&config.upstream.retry),
        Duration::from_secs(config.jobs.deadline_secs),
        kind,
        || {},
    )
    .await
    .with_context(|| format!("Failed to fetch {kind}"))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
