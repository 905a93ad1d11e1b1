//! Module: config
//! Responsibility: typed service configuration loaded from TOML, with
//! defaults for every field and validation of bounds.

use pidreg_core::error::RegistryError;
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path, time::Duration};
use thiserror::Error as ThisError;

/// External HTTP calls must time out within this window, in seconds.
pub const HTTP_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=9;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl From<ConfigError> for RegistryError {
    fn from(err: ConfigError) -> Self {
        Self::config(err.to_string())
    }
}

///
/// Environment
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Stage,
    /// Deterministic random scoring and in-process collaborators.
    Test,
}

///
/// Config
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub environment: Environment,
    pub registry: RegistryConfig,
    pub search: SearchConfig,
    pub queue: QueueConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub link_check: LinkCheckConfig,
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;

        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, secs) in [
            ("registry.timeout_secs", self.registry.timeout_secs),
            ("search.timeout_secs", self.search.timeout_secs),
            ("link_check.timeout_secs", self.link_check.timeout_secs),
        ] {
            if !HTTP_TIMEOUT_RANGE.contains(&secs) {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!(
                        "must be between {} and {} seconds, got {secs}",
                        HTTP_TIMEOUT_RANGE.start(),
                        HTTP_TIMEOUT_RANGE.end()
                    ),
                });
            }
        }
        if self.queue.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "queue.max_attempts",
                message: "must be at least 1".to_string(),
            });
        }
        if self.queue.workers == 0 || self.queue.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "queue.workers",
                message: "workers and capacity must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

///
/// RegistryConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Providers that manage resolution themselves; their identifiers are
    /// never bound, only refreshed.
    pub self_managed_providers: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: "https://mds.test.datacite.org".to_string(),
            timeout_secs: 5,
            self_managed_providers: Vec::new(),
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

///
/// SearchConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub url: String,
    pub index: String,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: "dois".to_string(),
            timeout_secs: 5,
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

///
/// QueueConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    pub workers: usize,
    pub capacity: usize,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            capacity: 1024,
            max_attempts: 3,
            backoff_ms: 1000,
        }
    }
}

///
/// CacheConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub max_entries: u64,
    pub metadata_ttl_secs: u64,
    pub totals_ttl_secs: u64,
    pub lookup_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            metadata_ttl_secs: 6 * 60 * 60,
            totals_ttl_secs: 24 * 60 * 60,
            lookup_ttl_secs: 24 * 60 * 60,
        }
    }
}

///
/// LogFormat
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

///
/// LoggingConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Per-target level overrides, e.g. `"pidreg::queue" = "debug"`.
    pub targets: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            targets: BTreeMap::new(),
        }
    }
}

///
/// LinkCheckConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LinkCheckConfig {
    pub timeout_secs: u64,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for LinkCheckConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            max_redirects: 10,
            user_agent: concat!("pidreg/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl LinkCheckConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml_str("").expect("empty config should parse");

        assert_eq!(config, Config::default());
        assert_eq!(config.cache.metadata_ttl_secs, 21_600);
        assert_eq!(config.queue.max_attempts, 3);
    }

    #[test]
    fn sections_override_individual_fields() {
        let config = Config::from_toml_str(
            r#"
            environment = "test"

            [registry]
            url = "https://mds.example.org"
            self_managed_providers = ["ethz"]

            [logging]
            format = "json"
            targets = { "pidreg::queue" = "debug" }
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.registry.url, "https://mds.example.org");
        assert_eq!(config.registry.timeout_secs, 5);
        assert_eq!(config.registry.self_managed_providers, vec!["ethz".to_string()]);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.targets.get("pidreg::queue").map(String::as_str), Some("debug"));
    }

    #[test]
    fn out_of_range_timeouts_are_rejected() {
        let err = Config::from_toml_str("[search]\ntimeout_secs = 30\n").expect_err("30s should be rejected");

        assert!(matches!(err, ConfigError::Invalid { field: "search.timeout_secs", .. }));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml_str("[queue]\nretries = 2\n").expect_err("unknown key should fail");

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn config_errors_convert_to_config_origin() {
        let err: RegistryError = ConfigError::Invalid {
            field: "queue.max_attempts",
            message: "must be at least 1".to_string(),
        }
        .into();

        assert_eq!(err.origin, pidreg_core::error::ErrorOrigin::Config);
    }
}
