//! CloudWatch Embedded Metric Format documents
//!
//! <https://docs.aws.amazon.com/AmazonCloudWatch/latest/monitoring/CloudWatch_Embedded_Metric_Format_Specification.html>
//!
//! One document per series, one document per line. Metric values and
//! dimension values are root members; the `_aws` member describes them.

use crate::dimensions::DimensionPath;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// EMF allows at most 30 dimensions per dimension set
pub const MAX_DIMENSIONS: usize = 30;

/// EMF allows at most 100 values in a single metric array
pub const MAX_VALUES_PER_DOCUMENT: usize = 100;

/// Root member holding the metadata
pub const ROOT_ELEMENT: &str = "_aws";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Unit {
    Count,
    #[serde(rename = "None")]
    Unitless,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricDefinition<'a> {
    pub name: &'a str,
    pub unit: Unit,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricDirective<'a> {
    pub namespace: &'a str,
    pub dimensions: Vec<Vec<&'a str>>,
    pub metrics: Vec<MetricDefinition<'a>>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Metadata<'a> {
    pub cloud_watch_metrics: Vec<MetricDirective<'a>>,
    pub timestamp: i64,
}

impl<'a> Metadata<'a> {
    /// Metadata for a single metric of one series
    pub fn for_series(
        namespace: &'a str,
        metric: &'a str,
        unit: Unit,
        path: &'a DimensionPath,
        timestamp: i64,
    ) -> Self {
        Metadata {
            cloud_watch_metrics: vec![MetricDirective {
                namespace,
                dimensions: vec![path.labels()],
                metrics: vec![MetricDefinition { name: metric, unit }],
            }],
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum MetricValue<'a> {
    Single(f64),
    Values(&'a [f64]),
}

/// A complete document for one series
#[derive(Debug)]
pub struct SeriesDocument<'a> {
    pub metric: &'a str,
    pub value: MetricValue<'a>,
    pub dimensions: &'a DimensionPath,
    pub metadata: &'a Metadata<'a>,
}

impl Serialize for SeriesDocument<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(self.metric, &self.value)?;
        for (label, value) in self.dimensions.pairs() {
            map.serialize_entry(label, value)?;
        }
        map.serialize_entry(ROOT_ELEMENT, self.metadata)?;
        map.end()
    }
}

/// First root key of a series document that would repeat an earlier one.
///
/// The metric value, each dimension label and `_aws` all share the root
/// object, so none of them may coincide.
pub fn conflicting_key<'a>(metric: &'a str, path: &'a DimensionPath) -> Option<&'a str> {
    if metric == ROOT_ELEMENT {
        return Some(metric);
    }
    let labels = path.labels();
    labels.iter().enumerate().find_map(|(i, &label)| {
        let taken = label == metric || label == ROOT_ELEMENT || labels[..i].contains(&label);
        taken.then_some(label)
    })
}

/// Append `doc` to `buf` as a single JSON line.
pub fn write_document(buf: &mut Vec<u8>, doc: &SeriesDocument<'_>) -> Result<(), serde_json::Error> {
    serde_json::to_writer(&mut *buf, doc)?;
    buf.push(b'\n');
    Ok(())
}
