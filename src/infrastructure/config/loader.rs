use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Base duration of zero.
    #[error("Invalid base_duration_ms: {0}. Must be positive")]
    InvalidBaseDuration(u64),

    /// Tick interval of zero.
    #[error("Invalid tick_interval_ms: {0}. Must be positive")]
    InvalidTickInterval(u64),

    /// Deadline poll of zero.
    #[error("Invalid deadline_poll_ms: {0}. Must be positive")]
    InvalidDeadlinePoll(u64),

    /// No concurrent calls allowed.
    #[error("Invalid max_concurrent: {0}. Must be between 1 and 16")]
    InvalidMaxConcurrent(usize),

    /// Temperature outside `0..=2`.
    #[error("Invalid temperature: {0}. Must be between 0.0 and 2.0")]
    InvalidTemperature(f32),

    /// Request timeout of zero.
    #[error("Invalid timeout_secs: {0}. Must be positive")]
    InvalidTimeout(u64),

    /// Unknown log level name.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Blank provider setting.
    #[error("Provider {0} cannot be empty")]
    EmptyProviderField(&'static str),

    /// Blank storage path.
    #[error("Storage path {0} cannot be empty")]
    EmptyStoragePath(&'static str),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `.hypercycle/config.yaml`
    /// 3. `.hypercycle/local.yaml`
    /// 4. Environment variables (`HYPERCYCLE_*`, `__` separates nested keys)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".hypercycle/config.yaml"))
            .merge(Yaml::file(".hypercycle/local.yaml"))
            .merge(Env::prefixed("HYPERCYCLE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("HYPERCYCLE_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let cycle = &config.cycle;
        if cycle.base_duration_ms == 0 {
            return Err(ConfigError::InvalidBaseDuration(cycle.base_duration_ms));
        }
        if cycle.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval(cycle.tick_interval_ms));
        }
        if cycle.deadline_poll_ms == 0 {
            return Err(ConfigError::InvalidDeadlinePoll(cycle.deadline_poll_ms));
        }

        let max_concurrent = config.dispatcher.max_concurrent;
        if max_concurrent == 0 || max_concurrent > 16 {
            return Err(ConfigError::InvalidMaxConcurrent(max_concurrent));
        }

        let provider = &config.provider;
        if provider.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyProviderField("base_url"));
        }
        if provider.model.trim().is_empty() {
            return Err(ConfigError::EmptyProviderField("model"));
        }
        if !(0.0..=2.0).contains(&provider.temperature) {
            return Err(ConfigError::InvalidTemperature(provider.temperature));
        }
        if provider.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(provider.timeout_secs));
        }

        if config.storage.history_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStoragePath("history_path"));
        }
        if config.storage.criteria_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStoragePath("criteria_path"));
        }
        if config.storage.halt_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStoragePath("halt_path"));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{LogFormat, RotationPolicy};
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cycle.base_duration_ms, 60_000);
        assert_eq!(config.cycle.max_overtime_ms, 60_000);
        assert_eq!(config.dispatcher.max_concurrent, 1);
        assert_eq!(config.dispatcher.min_spacing_ms, 3_000);
        assert_eq!(config.storage.history_path, PathBuf::from(".hypercycle/history.json"));
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
cycle:
  base_duration_ms: 30000
  tick_interval_ms: 500
dispatcher:
  max_concurrent: 2
  min_spacing_ms: 0
provider:
  model: openai/gpt-4o-mini
logging:
  level: debug
  format: json
  rotation: hourly
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.cycle.base_duration_ms, 30_000);
        assert_eq!(config.cycle.tick_interval_ms, 500);
        assert_eq!(config.cycle.deadline_poll_ms, 1_000);
        assert_eq!(config.dispatcher.max_concurrent, 2);
        assert_eq!(config.dispatcher.min_spacing_ms, 0);
        assert_eq!(config.provider.model, "openai/gpt-4o-mini");
        assert_eq!(config.provider.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.rotation, RotationPolicy::Hourly);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default();
        config.dispatcher.max_concurrent = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConcurrent(0))
        ));
    }

    #[test]
    fn test_validate_zero_tick_and_poll() {
        let mut config = Config::default();
        config.cycle.tick_interval_ms = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTickInterval(0))
        ));

        let mut config = Config::default();
        config.cycle.deadline_poll_ms = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidDeadlinePoll(0))
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_provider_fields() {
        let mut config = Config::default();
        config.provider.model = "  ".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyProviderField("model"))
        ));

        let mut config = Config::default();
        config.provider.temperature = 3.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTemperature(_))
        ));
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "cycle:\n  base_duration_ms: 10000\nlogging:\n  level: warn"
        )
        .unwrap();
        file.flush().unwrap();

        temp_env::with_vars(
            [
                ("HYPERCYCLE_CYCLE__BASE_DURATION_MS", Some("20000")),
                ("HYPERCYCLE_DISPATCHER__MAX_CONCURRENT", Some("3")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.cycle.base_duration_ms, 20_000, "env should win");
                assert_eq!(config.dispatcher.max_concurrent, 3);
                assert_eq!(config.logging.level, "warn", "file value should persist");
            },
        );
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "dispatcher:\n  max_concurrent: 0").unwrap();
        file.flush().unwrap();

        temp_env::with_var_unset("HYPERCYCLE_DISPATCHER__MAX_CONCURRENT", || {
            assert!(ConfigLoader::load_from_file(file.path()).is_err());
        });
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "cycle:\n  tick_interval_ms: 100\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "cycle:\n  tick_interval_ms: 250\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.cycle.tick_interval_ms, 250, "Override should win");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.format,
            LogFormat::Json,
            "Base value should persist when not overridden"
        );
    }
}
