//! Error types
//!
//! Recoverable failures only come from the exporter and configuration
//! loading. A malformed dimension path is a programming defect and is raised
//! as a [`ContractViolation`] panic payload instead.

use crate::export::MetricKind;
use std::fmt;

/// Panic payload raised when a dimension path with an odd remaining length
/// is used to address a node.
///
/// Recover it with `std::panic::catch_unwind` and
/// `payload.downcast_ref::<ContractViolation>()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractViolation {
    pub metric: String,
    pub path: Vec<String>,
    pub remaining: usize,
}

impl ContractViolation {
    pub(crate) fn raise(metric: &str, path: &[String], remaining: usize) -> ! {
        std::panic::panic_any(ContractViolation {
            metric: metric.to_owned(),
            path: path.to_vec(),
            remaining,
        })
    }
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dimension path {:?} for metric {:?} has {} dangling value(s); paths must be built with DimensionPath::extend",
            self.path, self.metric, self.remaining
        )
    }
}

/// Error type for exporter flushes
#[derive(Debug)]
pub enum ExportError {
    /// Writing the encoded documents failed
    Io(std::io::Error),
    /// A document could not be encoded as JSON
    Encode(serde_json::Error),
    /// The metric name is already registered with another kind
    KindConflict {
        metric: String,
        registered: MetricKind,
        requested: MetricKind,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "Failed to write metric documents: {}", e),
            ExportError::Encode(e) => write!(f, "Failed to encode metric document: {}", e),
            ExportError::KindConflict {
                metric,
                registered,
                requested,
            } => write!(
                f,
                "Metric {:?} is registered as {:?}, cannot register it as {:?}",
                metric, registered, requested
            ),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(e) => Some(e),
            ExportError::Encode(e) => Some(e),
            ExportError::KindConflict { .. } => None,
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Encode(e)
    }
}

/// Error type for configuration loading
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    /// An environment variable held a value that could not be parsed
    InvalidEnv { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config file: {}", e),
            ConfigError::InvalidEnv { var, value } => {
                write!(f, "Invalid value {:?} for {}", value, var)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::InvalidEnv { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}
