//! Metric Aggregation Space
//!
//! A [`Space`] is an N-dimensional vector space of timeseries. Each metric
//! name roots a tree of nodes; each (label, value) pair on a dimension path
//! selects a more specific child. Producers write concurrently, and an
//! exporter periodically calls [`Space::reset`] to detach everything
//! accumulated so far as a [`Snapshot`].
//!
//! Locking is two-tiered:
//! - the space lock guards the name → root map. Writers hold it shared for
//!   the duration of one write and only take it exclusively to insert a new
//!   root; `reset` takes it exclusively for the swap.
//! - each node has its own lock over its observations and children, so
//!   unrelated metrics and dimension values don't contend.
//!
//! Because writers hold the space lock shared until their write lands, a
//! write that started before `reset` is always contained in the returned
//! snapshot, and a write that starts after lands in the fresh tree.

mod node;

use crate::counter::{Counter, Histogram};
use crate::dimensions::DimensionPath;
use crate::error::ContractViolation;
use ahash::AHashMap;
use node::Node;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Space {
    nodes: RwLock<AHashMap<String, Node>>,
}

impl Space {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter handle for `name` bound to [`Space::add`].
    pub fn counter(self: &Arc<Self>, name: &str) -> Counter {
        Counter::new(Arc::clone(self), name)
    }

    /// Histogram handle for `name` bound to [`Space::observe`].
    pub fn histogram(self: &Arc<Self>, name: &str) -> Histogram {
        Histogram::new(Arc::clone(self), name)
    }

    /// Locate the series identified by `name` and `path` and append `value`
    /// to its observations.
    ///
    /// # Panics
    ///
    /// Panics with a [`ContractViolation`] payload if `path` has odd length.
    pub fn observe(&self, name: &str, path: &DimensionPath, value: f64) {
        check_path(name, path);
        self.with_root(name, |root| root.observe(path.as_slice(), value));
    }

    /// Locate the series identified by `name` and `path` and append the
    /// previous total plus `delta` (or `delta` for a fresh series).
    ///
    /// The observation list of a series written with `add` is the history of
    /// its running totals; the last entry is the current total.
    ///
    /// # Panics
    ///
    /// Panics with a [`ContractViolation`] payload if `path` has odd length.
    pub fn add(&self, name: &str, path: &DimensionPath, delta: f64) {
        check_path(name, path);
        self.with_root(name, |root| root.add(path.as_slice(), delta));
    }

    /// Depth-first traversal invoking `f` for every non-empty series.
    /// Return false from `f` to abort the whole traversal.
    ///
    /// Sibling order is unspecified. `f` must not write to this space.
    pub fn walk<F>(&self, mut f: F)
    where
        F: FnMut(&str, &DimensionPath, &[f64]) -> bool,
    {
        let nodes = self.nodes.read();
        let mut path = DimensionPath::new();
        for (name, root) in nodes.iter() {
            let mut visit = |p: &DimensionPath, obs: &[f64]| f(name.as_str(), p, obs);
            if !root.walk(&mut path, &mut visit) {
                return;
            }
        }
    }

    /// Detach everything accumulated so far, leaving this space empty.
    pub fn reset(&self) -> Snapshot {
        let detached = std::mem::take(&mut *self.nodes.write());
        Snapshot {
            space: Space {
                nodes: RwLock::new(detached),
            },
        }
    }

    /// Number of non-empty series across all metrics
    pub fn series_count(&self) -> usize {
        self.nodes
            .read()
            .values()
            .map(|root| root.series_count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series_count() == 0
    }

    /// Run `f` against the root node for `name`, creating it if needed.
    /// The space lock is held shared for the duration of `f`.
    fn with_root<R>(&self, name: &str, f: impl FnOnce(&Node) -> R) -> R {
        {
            let nodes = self.nodes.read();
            if let Some(root) = nodes.get(name) {
                return f(root);
            }
        }

        let mut nodes = self.nodes.write();
        if !nodes.contains_key(name) {
            nodes.insert(name.to_owned(), Node::default());
        }
        let nodes = RwLockWriteGuard::downgrade(nodes);
        f(&nodes[name])
    }
}

fn check_path(name: &str, path: &DimensionPath) {
    if path.len() % 2 != 0 {
        ContractViolation::raise(name, path.as_slice(), 1);
    }
}

/// Contents detached from a [`Space`] by [`Space::reset`].
///
/// Nothing else holds a reference to this tree, so it can be walked without
/// contending with producers.
#[derive(Debug)]
pub struct Snapshot {
    space: Space,
}

impl Snapshot {
    /// See [`Space::walk`].
    pub fn walk<F>(&self, f: F)
    where
        F: FnMut(&str, &DimensionPath, &[f64]) -> bool,
    {
        self.space.walk(f)
    }

    pub fn series_count(&self) -> usize {
        self.space.series_count()
    }

    pub fn is_empty(&self) -> bool {
        self.space.is_empty()
    }
}
