use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {field}: {value:?}. Must be an http(s) URL")]
    InvalidUrl { field: &'static str, value: String },

    #[error("Invalid {0}: must be greater than 0")]
    ZeroDuration(&'static str),

    #[error("Invalid max_concurrent_jobs: {0}. Must be between 1 and 1000")]
    InvalidMaxConcurrentJobs(usize),

    #[error("Invalid dedup_capacity: must be at least 1")]
    InvalidDedupCapacity,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid endpoint for {0}: must start with '/'")]
    InvalidEndpoint(String),
}

/// Project configuration directory
pub const CONFIG_DIR: &str = ".acp-analyst";

/// Environment variable prefix; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "ACP_ANALYST_";

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .acp-analyst/config.yaml (project config)
    /// 3. .acp-analyst/local.yaml (local overrides, optional)
    /// 4. Environment variables (ACP_ANALYST_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(format!("{CONFIG_DIR}/config.yaml")))
            .merge(Yaml::file(format!("{CONFIG_DIR}/local.yaml")));

        Self::finish(figment, "Failed to extract configuration from figment")
    }

    /// Load configuration from a specific file, still honouring environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path));

        Self::finish(
            figment,
            &format!("Failed to load config from {}", path.display()),
        )
    }

    /// Load from `path` when given, otherwise from the project directory
    pub fn load_with_override(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    fn finish(figment: Figment, context: &str) -> Result<Config> {
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| context.to_string())?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        validate_url("upstream.base_url", &config.upstream.base_url)?;
        validate_url("acp.bridge_url", &config.acp.bridge_url)?;

        if config.upstream.timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("upstream.timeout_secs"));
        }
        if config.acp.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("acp.request_timeout_secs"));
        }
        if config.jobs.deadline_secs == 0 {
            return Err(ConfigError::ZeroDuration("jobs.deadline_secs"));
        }

        for (kind, endpoint) in &config.upstream.endpoints {
            if !endpoint.starts_with('/') {
                return Err(ConfigError::InvalidEndpoint(kind.slug().to_string()));
            }
        }

        let retry = &config.upstream.retry;
        if retry.initial_backoff_ms > retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                retry.initial_backoff_ms,
                retry.max_backoff_ms,
            ));
        }

        if config.jobs.max_concurrent_jobs == 0 || config.jobs.max_concurrent_jobs > 1000 {
            return Err(ConfigError::InvalidMaxConcurrentJobs(
                config.jobs.max_concurrent_jobs,
            ));
        }
        if config.jobs.dedup_capacity == 0 {
            return Err(ConfigError::InvalidDedupCapacity);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        Ok(())
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let host = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"));
    match host {
        Some(rest) if !rest.is_empty() => Ok(()),
        _ => Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ServiceKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.jobs.deadline_secs, 30);
        assert_eq!(config.jobs.max_concurrent_jobs, 10);
        assert_eq!(config.upstream.timeout_secs, 10);
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
agent:
  wallet_address: '0xabc'
  entity_id: 12
upstream:
  base_url: https://analysis.example.com
  timeout_secs: 5
  endpoints:
    market_peak: /v2/peak
  retry:
    max_retries: 1
jobs:
  deadline_secs: 20
  max_concurrent_jobs: 4
logging:
  level: debug
  format: pretty
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.agent.wallet_address, "0xabc");
        assert_eq!(config.agent.entity_id, Some(12));
        assert_eq!(config.upstream.base_url, "https://analysis.example.com");
        assert_eq!(config.upstream.endpoint_for(ServiceKind::MarketPeak), "/v2/peak");
        assert_eq!(config.upstream.retry.max_retries, 1);
        assert_eq!(config.upstream.retry.initial_backoff_ms, 500);
        assert_eq!(config.jobs.deadline_secs, 20);
        assert_eq!(config.jobs.max_concurrent_jobs, 4);
        assert_eq!(config.jobs.dedup_capacity, 10_000);
        assert_eq!(config.logging.format, "pretty");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_bad_urls() {
        let mut config = Config::default();
        config.upstream.base_url = "analysis.example.com".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidUrl { field: "upstream.base_url", .. })
        ));

        let mut config = Config::default();
        config.acp.bridge_url = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidUrl { field: "acp.bridge_url", .. })
        ));

        let mut config = Config::default();
        config.acp.bridge_url = "https://".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidUrl { field: "acp.bridge_url", .. })
        ));
    }

    #[test]
    fn test_validate_accepts_short_urls() {
        let mut config = Config::default();
        config.upstream.base_url = "http://a".to_string();
        config.acp.bridge_url = "https://b".to_string();
        ConfigLoader::validate(&config).expect("Short URLs should be valid");
    }

    #[test]
    fn test_validate_zero_durations() {
        let mut config = Config::default();
        config.jobs.deadline_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ZeroDuration("jobs.deadline_secs"))
        ));

        let mut config = Config::default();
        config.upstream.timeout_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ZeroDuration("upstream.timeout_secs"))
        ));
    }

    #[test]
    fn test_validate_concurrency_bounds() {
        let mut config = Config::default();
        config.jobs.max_concurrent_jobs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConcurrentJobs(0))
        ));

        config.jobs.max_concurrent_jobs = 1001;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConcurrentJobs(1001))
        ));
    }

    #[test]
    fn test_validate_invalid_log_settings() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));

        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogRotation(_))
        ));
    }

    #[test]
    fn test_validate_invalid_backoff_and_endpoint() {
        let mut config = Config::default();
        config.upstream.retry.initial_backoff_ms = 10_000;
        config.upstream.retry.max_backoff_ms = 1_000;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(10_000, 1_000))
        ));

        let mut config = Config::default();
        config
            .upstream
            .endpoints
            .insert(ServiceKind::BlackSwan, "api/swan".to_string());
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "upstream:\n  base_url: https://file.example.com\njobs:\n  deadline_secs: 15"
        )
        .unwrap();
        file.flush().unwrap();

        temp_env::with_vars(
            [
                ("ACP_ANALYST_JOBS__DEADLINE_SECS", Some("45")),
                ("ACP_ANALYST_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.upstream.base_url, "https://file.example.com");
                assert_eq!(config.jobs.deadline_secs, 45, "env should win over file");
                assert_eq!(config.logging.level, "debug");
            },
        );
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = ConfigLoader::load_from_file("/nonexistent/acp-analyst.yaml").unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "jobs:\n  max_concurrent_jobs: 0").unwrap();
        file.flush().unwrap();

        let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "jobs:\n  deadline_secs: 5\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "jobs:\n  deadline_secs: 25\nlogging:\n  level: warn").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.jobs.deadline_secs, 25, "Override should win");
        assert_eq!(config.logging.level, "warn", "Override should win for nested fields");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }
}
