use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use derivative::Derivative;

use crate::aggregate::AggregatedData;
use crate::segment_tree::SegmentTree;
use crate::versions::Snapshot;

/// Persistent subtree queries on a rooted tree with a fixed shape.
///
/// Nodes are laid out in pre-order, so the subtree of `u` is the contiguous range
/// `span[u][0]..span[u][1]` of a persistent [`SegmentTree`]. Changing the value of a node is a point
/// update there; the layout never changes and is shared by every version.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct SubtreeQuery<Ag: AggregatedData> {
    /// Pre-order `[start, end)` of each node's subtree.
    span: Rc<[[usize; 2]]>,
    values: SegmentTree<Ag>,
}

impl<Ag: AggregatedData> Debug for SubtreeQuery<Ag> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries((0..self.len()).filter_map(|u| Some((u, self.get(u)?))))
            .finish()
    }
}

impl<Ag: AggregatedData> SubtreeQuery<Ag> {
    /// Builds the tree where node `u` holds `values[u]` and has parent `parent[u]`. The parent of
    /// `root` is ignored. Children are visited in increasing label order.
    ///
    /// Panics if the lengths differ, a parent is out of range, or some node is not reachable from `root`.
    pub fn new(values: Vec<Ag::Data>, root: usize, parent: &[usize]) -> Self {
        let n = values.len();
        assert_eq!(parent.len(), n, "one parent per node expected");
        assert!(root < n, "root {root} out of range 0..{n}");
        let mut children = vec![vec![]; n];
        for (u, &p) in parent.iter().enumerate() {
            if u != root {
                assert!(p < n, "parent {p} of node {u} out of range 0..{n}");
                children[p].push(u);
            }
        }
        let mut order = Vec::with_capacity(n);
        let mut stack = vec![root];
        while let Some(u) = stack.pop() {
            order.push(u);
            stack.extend(children[u].iter().rev());
        }
        assert_eq!(order.len(), n, "parent array is not a tree rooted at {root}");
        let mut size = vec![1; n];
        for &u in order.iter().rev() {
            if u != root {
                size[parent[u]] += size[u];
            }
        }
        let mut span = vec![[0, 0]; n];
        for (i, &u) in order.iter().enumerate() {
            span[u] = [i, i + size[u]];
        }
        log::debug!("flattened tree of {n} nodes rooted at {root}");
        Self {
            span: span.into(),
            values: order.iter().map(|&u| values[u].clone()).collect(),
        }
    }
    pub fn len(&self) -> usize {
        self.span.len()
    }
    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }
    fn span(&self, u: usize) -> [usize; 2] {
        match self.span.get(u) {
            Some(&s) => s,
            None => panic!("node {u} out of range 0..{}", self.len()),
        }
    }
    /// Value of node u, None if out of range.
    pub fn get(&self, u: usize) -> Option<&Ag::Data> {
        let [start, _] = *self.span.get(u)?;
        self.values.get(start)
    }
    /// Aggregate of the values in the subtree of u, u included. Panics if u is out of range.
    pub fn subtree_agg(&self, u: usize) -> Ag {
        let [start, end] = self.span(u);
        self.values.range_agg(start..end)
    }
    /// Number of nodes in the subtree of u.
    pub fn subtree_size(&self, u: usize) -> usize {
        let [start, end] = self.span(u);
        end - start
    }
    /// True if v is in the subtree of u.
    pub fn is_ancestor(&self, u: usize, v: usize) -> bool {
        let ([us, ue], [vs, _]) = (self.span(u), self.span(v));
        us <= vs && vs < ue
    }
    /// New version with the value of node u changed. Panics if u is out of range.
    pub fn update(&self, u: usize, f: impl FnOnce(&mut Ag::Data)) -> Self {
        let [start, _] = self.span(u);
        log::trace!("subtree query update of node {u}");
        Self {
            span: self.span.clone(),
            values: self.values.update(start, f),
        }
    }
    /// New version with node u set to data. Panics if u is out of range.
    pub fn set(&self, u: usize, data: Ag::Data) -> Self {
        self.update(u, |d| *d = data)
    }
}

impl<Ag: AggregatedData> Snapshot for SubtreeQuery<Ag> {
    fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.span, &other.span) && self.values.same_as(&other.values)
    }
}
