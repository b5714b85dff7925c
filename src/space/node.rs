use crate::dimensions::DimensionPath;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::borrow::Borrow;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// One point in the vector space. Collects observations for the series it
/// addresses and owns the more specific child series below it.
///
/// The lock covers this node only. Descent never holds a parent's lock while
/// taking a child's, so disjoint branches are updated independently.
#[derive(Debug, Default)]
pub(super) struct Node {
    state: RwLock<NodeState>,
}

#[derive(Debug, Default)]
struct NodeState {
    observations: Vec<f64>,
    children: AHashMap<Pair, Arc<Node>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pair {
    label: String,
    value: String,
}

/// Borrowed view of a child key, so lookups don't allocate.
trait PairKey {
    fn key(&self) -> (&str, &str);
}

impl PairKey for Pair {
    fn key(&self) -> (&str, &str) {
        (&self.label, &self.value)
    }
}

impl PairKey for (&str, &str) {
    fn key(&self) -> (&str, &str) {
        (self.0, self.1)
    }
}

impl<'a> Borrow<dyn PairKey + 'a> for Pair {
    fn borrow(&self) -> &(dyn PairKey + 'a) {
        self
    }
}

impl Hash for dyn PairKey + '_ {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

impl PartialEq for dyn PairKey + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for dyn PairKey + '_ {}

// Must agree with the `dyn PairKey` impl for borrowed lookups to hit.
impl Hash for Pair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

impl Node {
    /// Append `value` verbatim at the node addressed by `path`.
    pub(super) fn observe(&self, path: &[String], value: f64) {
        self.descend(path).state.write().observations.push(value);
    }

    /// Append the new running total at the node addressed by `path`.
    ///
    /// The read of the last total and the append happen under one write
    /// guard, so concurrent adds to the same series never lose an update.
    pub(super) fn add(&self, path: &[String], delta: f64) {
        let target = self.descend(path);
        let mut state = target.state.write();
        let total = match state.observations.last() {
            Some(last) => last + delta,
            None => delta,
        };
        state.observations.push(total);
    }

    /// Depth-first visit of every node carrying observations.
    /// Returns false once `f` asks to stop.
    pub(super) fn walk<F>(&self, path: &mut DimensionPath, f: &mut F) -> bool
    where
        F: FnMut(&DimensionPath, &[f64]) -> bool,
    {
        let state = self.state.read();
        if !state.observations.is_empty() && !f(&*path, state.observations.as_slice()) {
            return false;
        }
        for (pair, child) in state.children.iter() {
            path.push_pair(&pair.label, &pair.value);
            let keep_going = child.walk(path, f);
            path.pop_pair();
            if !keep_going {
                return false;
            }
        }
        true
    }

    /// Number of non-empty series at or below this node
    pub(super) fn series_count(&self) -> usize {
        let state = self.state.read();
        let own = usize::from(!state.observations.is_empty());
        own + state
            .children
            .values()
            .map(|child| child.series_count())
            .sum::<usize>()
    }

    /// Walk down `path` two values at a time, creating nodes as needed.
    /// The caller has already checked that `path` has even length.
    fn descend(&self, path: &[String]) -> NodeRef<'_> {
        debug_assert!(path.len() % 2 == 0);
        let mut current = NodeRef::Root(self);
        for pair in path.chunks_exact(2) {
            let next = current.child(&pair[0], &pair[1]);
            current = NodeRef::Child(next);
        }
        current
    }

    fn child(&self, label: &str, value: &str) -> Arc<Node> {
        let key = (label, value);
        if let Some(child) = self.state.read().children.get(&key as &dyn PairKey) {
            return Arc::clone(child);
        }

        let mut state = self.state.write();
        let child = state
            .children
            .entry(Pair {
                label: label.to_owned(),
                value: value.to_owned(),
            })
            .or_default();
        Arc::clone(child)
    }
}

/// Either the metric's root node (owned by the space map) or a shared child.
enum NodeRef<'a> {
    Root(&'a Node),
    Child(Arc<Node>),
}

impl std::ops::Deref for NodeRef<'_> {
    type Target = Node;

    fn deref(&self) -> &Node {
        match self {
            NodeRef::Root(node) => node,
            NodeRef::Child(node) => node,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_borrowed_lookup_finds_owned_key() {
        let node = Node::default();
        let first = node.child("a", "1");
        let second = node.child("a", "1");
        assert!(Arc::ptr_eq(&first, &second));

        let other = node.child("a", "2");
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_add_records_running_totals() {
        let node = Node::default();
        for delta in [1.0, 2.0, 3.0] {
            node.add(&path(&["k", "v"]), delta);
        }

        let mut seen = Vec::new();
        node.walk(&mut DimensionPath::new(), &mut |p: &DimensionPath, obs: &[f64]| {
            seen.push((p.clone(), obs.to_vec()));
            true
        });
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.as_slice(), &["k", "v"]);
        assert_eq!(seen[0].1, vec![1.0, 3.0, 6.0]);
    }

    #[test]
    fn test_intermediate_nodes_are_not_reported() {
        let node = Node::default();
        node.observe(&path(&["bar", "1", "baz", "2"]), 123.0);

        let mut count = 0;
        node.walk(&mut DimensionPath::new(), &mut |_: &DimensionPath, _: &[f64]| {
            count += 1;
            true
        });
        assert_eq!(count, 1);
        assert_eq!(node.series_count(), 1);
    }
}
