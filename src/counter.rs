//! Producer Handles
//!
//! [`Counter`] and [`Histogram`] are cheap, immutable handles bound to a
//! metric name, a fixed dimension prefix and the owning [`Space`]. Deriving
//! a more specific handle with `with_dimensions` never touches the original.

use crate::dimensions::DimensionPath;
use crate::space::Space;
use std::fmt;
use std::sync::Arc;

/// Cumulative counter. Each [`Counter::add`] records the new running total
/// of its series.
#[derive(Clone)]
pub struct Counter {
    name: Arc<str>,
    path: DimensionPath,
    space: Arc<Space>,
}

impl Counter {
    pub fn new(space: Arc<Space>, name: &str) -> Self {
        Counter {
            name: Arc::from(name),
            path: DimensionPath::new(),
            space,
        }
    }

    /// Returns a counter for the same metric with `pairs` appended to its
    /// dimension path. A trailing label without a value gets `"unknown"`.
    pub fn with_dimensions<S: AsRef<str>>(&self, pairs: &[S]) -> Counter {
        Counter {
            name: Arc::clone(&self.name),
            path: self.path.extend(pairs),
            space: Arc::clone(&self.space),
        }
    }

    #[inline]
    pub fn add(&self, delta: f64) {
        self.space.add(&self.name, &self.path, delta);
    }

    /// Shorthand for `add(1.0)`
    #[inline]
    pub fn incr(&self) {
        self.add(1.0);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> &DimensionPath {
        &self.path
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Raw sample collector. Each [`Histogram::observe`] appends the value
/// verbatim to its series.
#[derive(Clone)]
pub struct Histogram {
    name: Arc<str>,
    path: DimensionPath,
    space: Arc<Space>,
}

impl Histogram {
    pub fn new(space: Arc<Space>, name: &str) -> Self {
        Histogram {
            name: Arc::from(name),
            path: DimensionPath::new(),
            space,
        }
    }

    pub fn with_dimensions<S: AsRef<str>>(&self, pairs: &[S]) -> Histogram {
        Histogram {
            name: Arc::clone(&self.name),
            path: self.path.extend(pairs),
            space: Arc::clone(&self.space),
        }
    }

    #[inline]
    pub fn observe(&self, value: f64) {
        self.space.observe(&self.name, &self.path, value);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> &DimensionPath {
        &self.path
    }
}

impl fmt::Debug for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Histogram")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(space: &Space) -> Vec<(String, DimensionPath, Vec<f64>)> {
        let mut out = Vec::new();
        space.walk(|name, path, obs| {
            out.push((name.to_string(), path.clone(), obs.to_vec()));
            true
        });
        out.sort_by(|a, b| a.1.as_slice().cmp(b.1.as_slice()));
        out
    }

    #[test]
    fn test_with_dimensions_leaves_original_untouched() {
        let space = Arc::new(Space::new());
        let base = space.counter("alerts").with_dimensions(&["type", "rule"]);
        let high = base.with_dimensions(&["severity", "HIGH"]);
        let low = base.with_dimensions(&["severity", "LOW"]);

        assert_eq!(base.dimensions().as_slice(), &["type", "rule"]);
        assert_eq!(high.dimensions().as_slice(), &["type", "rule", "severity", "HIGH"]);
        assert_eq!(low.dimensions().as_slice(), &["type", "rule", "severity", "LOW"]);
        assert_eq!(high.name(), "alerts");
    }

    #[test]
    fn test_counter_add_goes_through_space_add() {
        let space = Arc::new(Space::new());
        let counter = space.counter("test");
        counter.add(10.0);
        counter.add(5.0);
        counter.incr();

        let series = collect(&space);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].0, "test");
        assert!(series[0].1.is_empty());
        assert_eq!(series[0].2, vec![10.0, 15.0, 16.0]);
    }

    #[test]
    fn test_histogram_keeps_raw_samples() {
        let space = Arc::new(Space::new());
        let latency = space.histogram("latency").with_dimensions(&["route"]);
        latency.observe(3.0);
        latency.observe(1.0);

        let series = collect(&space);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].1.as_slice(), &["route", "unknown"]);
        assert_eq!(series[0].2, vec![3.0, 1.0]);
    }

    #[test]
    fn test_sibling_counters_are_distinct_series() {
        let space = Arc::new(Space::new());
        let counter = space.counter("test");
        counter.with_dimensions(&["dimension1", "value1"]).add(1.0);
        counter.with_dimensions(&["dimension2", "value2"]).add(2.0);

        let series = collect(&space);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].1.as_slice(), &["dimension1", "value1"]);
        assert_eq!(series[0].2, vec![1.0]);
        assert_eq!(series[1].1.as_slice(), &["dimension2", "value2"]);
        assert_eq!(series[1].2, vec![2.0]);
    }
}
