//! Dimension Paths
//!
//! A dimension path is an ordered list of alternating label/value strings
//! that identifies one timeseries under a metric name. Order matters:
//! `[a=1 b=2]` and `[b=2 a=1]` are different timeseries.

use std::fmt;

/// Value appended when a path is extended with an odd number of strings.
pub const UNKNOWN_DIMENSION_VALUE: &str = "unknown";

/// Ordered (label, value) pairs addressing a node in a [`Space`](crate::Space).
///
/// Paths built through [`DimensionPath::extend`] always have even length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DimensionPath {
    values: Vec<String>,
}

impl DimensionPath {
    /// The empty path (the metric's root series)
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap raw values without padding.
    ///
    /// An odd-length raw path is accepted here but rejected with a
    /// [`ContractViolation`](crate::ContractViolation) panic once it is used
    /// to address a node. Prefer [`DimensionPath::extend`].
    pub fn from_raw<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DimensionPath {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns a new path with `pairs` appended, padding a trailing label
    /// with [`UNKNOWN_DIMENSION_VALUE`]. The receiver is never modified.
    pub fn extend<S: AsRef<str>>(&self, pairs: &[S]) -> Self {
        let mut values = Vec::with_capacity(self.values.len() + pairs.len() + 1);
        values.extend(self.values.iter().cloned());
        values.extend(pairs.iter().map(|s| s.as_ref().to_owned()));
        if pairs.len() % 2 != 0 {
            values.push(UNKNOWN_DIMENSION_VALUE.to_owned());
        }
        DimensionPath { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.values
    }

    /// Iterate (label, value) pairs. A dangling trailing label is skipped.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .chunks_exact(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }

    /// Label names in path order
    pub fn labels(&self) -> Vec<&str> {
        self.pairs().map(|(label, _)| label).collect()
    }

    pub(crate) fn push_pair(&mut self, label: &str, value: &str) {
        self.values.push(label.to_owned());
        self.values.push(value.to_owned());
    }

    pub(crate) fn pop_pair(&mut self) {
        self.values.truncate(self.values.len().saturating_sub(2));
    }
}

impl fmt::Display for DimensionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (label, value)) in self.pairs().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}={}", label, value)?;
        }
        write!(f, "]")
    }
}
