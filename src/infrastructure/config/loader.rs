use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::{Config, MAX_FALLBACK_CONFIDENCE};

/// Configuration error types
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid queue.max_concurrent: {0}. Must be at least 1")]
    InvalidMaxConcurrent(usize),

    #[error("Invalid queue.max_queue_size: {0}. Must be at least 1")]
    InvalidMaxQueueSize(usize),

    #[error("Invalid fallback.confidence: {0}. Must be between 0 and 0.2")]
    InvalidFallbackConfidence(f64),

    #[error("Invalid fallback.score: {0}. Must be between 0 and 100")]
    InvalidFallbackScore(f64),

    #[error("Invalid orchestration.fast_budget_ms: {0}. Must be positive")]
    InvalidFastBudget(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid delivery endpoint: {0}. Must start with http:// or https://")]
    InvalidEndpoint(String),
}

/// Project-local config directory.
pub const CONFIG_DIR: &str = ".brandscore";

/// Environment variables read before the prefixed ones existed.
const LEGACY_ENV: [(&str, &str); 2] = [
    ("QUEUE_MAX_CONCURRENT", "queue.max_concurrent"),
    ("QUEUE_MAX_SIZE", "queue.max_queue_size"),
];

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. .brandscore/config.yaml
    /// 3. .brandscore/local.yaml (optional)
    /// 4. Legacy `QUEUE_MAX_CONCURRENT` / `QUEUE_MAX_SIZE`
    /// 5. `BRANDSCORE_*` environment variables, `__` separating sections
    pub fn load() -> Result<Config> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(format!("{CONFIG_DIR}/config.yaml")))
            .merge(Yaml::file(format!("{CONFIG_DIR}/local.yaml")));

        Self::finish(figment).context("Failed to extract configuration from figment")
    }

    /// Load defaults, one explicit file, then environment overrides.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path));

        Self::finish(figment).with_context(|| format!("Failed to load config from {}", path.display()))
    }

    fn finish(figment: Figment) -> Result<Config> {
        let legacy = Env::raw()
            .only(&LEGACY_ENV.map(|(var, _)| var))
            .map(|key| {
                LEGACY_ENV
                    .iter()
                    .find(|(var, _)| key.as_str().eq_ignore_ascii_case(var))
                    .map_or_else(|| key.into(), |(_, path)| (*path).into())
            });

        let config: Config = figment
            .merge(legacy)
            // BRANDSCORE_CONFIG names the file itself and is read by the CLI.
            .merge(Env::prefixed("BRANDSCORE_").ignore(&["config"]).split("__"))
            .extract()?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.queue.max_concurrent == 0 {
            return Err(ConfigError::InvalidMaxConcurrent(config.queue.max_concurrent));
        }
        if config.queue.max_queue_size == 0 {
            return Err(ConfigError::InvalidMaxQueueSize(config.queue.max_queue_size));
        }

        let confidence = config.fallback.confidence;
        if !(0.0..=MAX_FALLBACK_CONFIDENCE).contains(&confidence) {
            return Err(ConfigError::InvalidFallbackConfidence(confidence));
        }
        let score = config.fallback.score;
        if !(0.0..=100.0).contains(&score) {
            return Err(ConfigError::InvalidFallbackScore(score));
        }

        if config.orchestration.fast_budget_ms == 0 {
            return Err(ConfigError::InvalidFastBudget(0));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        if let Some(endpoint) = config
            .delivery
            .endpoints
            .iter()
            .find(|e| !(e.starts_with("http://") || e.starts_with("https://")))
        {
            return Err(ConfigError::InvalidEndpoint(endpoint.clone()));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::domain::models::ProfileKind;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.queue.max_concurrent, 3);
        assert_eq!(config.queue.max_queue_size, 50);
        assert_eq!(config.database.path, ".brandscore/executions.db");
        assert_eq!(config.orchestration.profile, ProfileKind::Hybrid);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
queue:
  max_concurrent: 6
  retention_secs: 600
fallback:
  score: 30
  confidence: 0.15
orchestration:
  profile: performance
delivery:
  endpoints:
    - http://queue-a.internal
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.queue.max_concurrent, 6);
        assert_eq!(config.queue.max_queue_size, 50);
        assert_eq!(config.queue.retention_secs, 600);
        assert!((config.fallback.confidence - 0.15).abs() < f64::EPSILON);
        assert_eq!(config.orchestration.profile, ProfileKind::Performance);
        assert_eq!(config.delivery.endpoints, vec!["http://queue-a.internal".to_string()]);
        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<Config, _> = serde_yaml::from_str("queue:\n  max_workers: 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default();
        config.queue.max_concurrent = 0;
        assert_eq!(ConfigLoader::validate(&config), Err(ConfigError::InvalidMaxConcurrent(0)));
    }

    #[test]
    fn test_validate_zero_queue_size() {
        let mut config = Config::default();
        config.queue.max_queue_size = 0;
        assert_eq!(ConfigLoader::validate(&config), Err(ConfigError::InvalidMaxQueueSize(0)));
    }

    #[test]
    fn test_validate_fallback_confidence_ceiling() {
        let mut config = Config::default();
        config.fallback.confidence = 0.2;
        assert!(ConfigLoader::validate(&config).is_ok());

        config.fallback.confidence = 0.25;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidFallbackConfidence(_))
        ));
    }

    #[test]
    fn test_validate_fallback_score_range() {
        let mut config = Config::default();
        config.fallback.score = 101.0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidFallbackScore(_))
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_endpoint_scheme() {
        let mut config = Config::default();
        config.delivery.endpoints = vec!["queue.internal:8080".to_string()];
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_validate_empty_database_path() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert_eq!(ConfigLoader::validate(&config), Err(ConfigError::EmptyDatabasePath));
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(base_file, "queue:\n  max_concurrent: 2\n  max_queue_size: 10\nlogging:\n  format: json").unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "queue:\n  max_concurrent: 4").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.queue.max_concurrent, 4, "Override should win");
        assert_eq!(config.queue.max_queue_size, 10, "Base value should persist");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = ConfigLoader::load_from_file("/nonexistent/brandscore.yaml").unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }
}
