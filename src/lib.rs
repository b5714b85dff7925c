pub mod config;
pub mod counter;
pub mod dimensions;
pub mod error;
pub mod export;
pub mod observability;
pub mod space;

pub use config::{ExporterConfig, LogFormat};
pub use counter::{Counter, Histogram};
pub use dimensions::{DimensionPath, UNKNOWN_DIMENSION_VALUE};
pub use error::{ConfigError, ContractViolation, ExportError};
pub use export::{EmfExporter, MetricKind};
pub use observability::init_tracing;
pub use space::{Snapshot, Space};
