use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_NAMESPACE: &str = "METRIC_SPACE_NAMESPACE";
pub const ENV_FLUSH_INTERVAL_MS: &str = "METRIC_SPACE_FLUSH_INTERVAL_MS";
pub const ENV_LOG_FORMAT: &str = "METRIC_SPACE_LOG_FORMAT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Exporter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Namespace stamped on every emitted metric document
    pub namespace: String,
    /// Interval between drain/flush cycles in milliseconds
    pub flush_interval_ms: u64,
    /// Log output format for the host process
    pub log_format: LogFormat,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        ExporterConfig {
            namespace: "MetricSpace".to_string(),
            flush_interval_ms: 60_000,
            log_format: LogFormat::Text,
        }
    }
}

impl ExporterConfig {
    /// Defaults overridden by any `METRIC_SPACE_*` variables that are set
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from a TOML file. Missing keys fall back to defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            config.namespace = namespace;
        }
        if let Some(value) = lookup(ENV_FLUSH_INTERVAL_MS) {
            config.flush_interval_ms = match value.parse() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: ENV_FLUSH_INTERVAL_MS,
                        value,
                    })
                }
            };
        }
        if let Some(value) = lookup(ENV_LOG_FORMAT) {
            config.log_format = value.parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_LOG_FORMAT,
                value,
            })?;
        }
        Ok(config)
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval_ms = interval.as_millis().max(1) as u64;
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Get flush interval as Duration
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let vars: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |var: &'static str| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ExporterConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ExporterConfig::default());
        assert_eq!(config.flush_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_env_overrides() {
        let config = ExporterConfig::from_lookup(lookup_from(&[
            (ENV_NAMESPACE, "Alerts"),
            (ENV_FLUSH_INTERVAL_MS, "250"),
            (ENV_LOG_FORMAT, "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.namespace, "Alerts");
        assert_eq!(config.flush_interval(), Duration::from_millis(250));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_interval_rejected() {
        for bad in ["0", "soon", "-5"] {
            let err = ExporterConfig::from_lookup(lookup_from(&[(ENV_FLUSH_INTERVAL_MS, bad)]))
                .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidEnv { var: ENV_FLUSH_INTERVAL_MS, .. }
            ));
        }
    }

    #[test]
    fn test_invalid_log_format_rejected() {
        let err = ExporterConfig::from_lookup(lookup_from(&[(ENV_LOG_FORMAT, "yaml")])).unwrap_err();
        match err {
            ConfigError::InvalidEnv { var, value } => {
                assert_eq!(var, ENV_LOG_FORMAT);
                assert_eq!(value, "yaml");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "namespace = \"Forwarder\"").unwrap();
        writeln!(file, "log_format = \"json\"").unwrap();

        let config = ExporterConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.namespace, "Forwarder");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.flush_interval_ms, 60_000);
    }

    #[test]
    fn test_builders() {
        let config = ExporterConfig::default()
            .with_namespace("Test")
            .with_flush_interval(Duration::from_millis(10))
            .with_log_format(LogFormat::Json);
        assert_eq!(config.namespace, "Test");
        assert_eq!(config.flush_interval_ms, 10);
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
