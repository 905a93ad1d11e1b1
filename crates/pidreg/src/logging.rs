//! Module: logging
//! Responsibility: install the process-wide `tracing` subscriber.

use crate::config::{LogFormat, LoggingConfig};
use pidreg_core::error::RegistryError;
use tracing_subscriber::EnvFilter;

// Third-party targets that are noisy at `info`.
const QUIET_TARGETS: &[(&str, &str)] = &[("hyper", "warn"), ("reqwest", "warn"), ("h2", "warn"), ("rustls", "warn")];

/// Build the filter from the base level, the quiet defaults, and the
/// configured per-target overrides (which win).
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, RegistryError> {
    let mut directives = vec![config.level.clone()];
    directives.extend(QUIET_TARGETS.iter().map(|(target, level)| format!("{target}={level}")));
    directives.extend(config.targets.iter().map(|(target, level)| format!("{target}={level}")));

    let joined = directives.join(",");
    EnvFilter::try_new(&joined).map_err(|err| RegistryError::config(format!("invalid log filter '{joined}': {err}")))
}

/// Install the global subscriber. A second call reports an error instead
/// of replacing the first subscriber.
pub fn init(config: &LoggingConfig) -> Result<(), RegistryError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|err| RegistryError::config(format!("failed to install log subscriber: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn filter_appends_overrides_after_defaults() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            targets: BTreeMap::from([("pidreg::queue".to_string(), "trace".to_string())]),
            ..LoggingConfig::default()
        };

        let rendered = build_filter(&config).expect("filter should build").to_string();

        assert!(rendered.contains("pidreg::queue=trace"));
        assert!(rendered.contains("hyper=warn"));
    }

    #[test]
    fn malformed_level_is_a_config_error() {
        let config = LoggingConfig {
            level: "loud=[".to_string(),
            ..LoggingConfig::default()
        };

        let err = build_filter(&config).expect_err("malformed directive should fail");

        assert_eq!(err.origin, pidreg_core::error::ErrorOrigin::Config);
    }
}
