//! Snapshot Export
//!
//! Drains a [`Space`](crate::Space) on a timer and writes every series as a
//! CloudWatch Embedded Metric Format document. Transport beyond the
//! provided `Write` sink (stdout in a Lambda-style host) is out of scope.

pub mod emf;
mod exporter;

pub use exporter::{EmfExporter, MetricKind};
