use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::Debug;
use std::ops::{Bound, RangeBounds};
use std::rc::Rc;

use debug_tree::{add_branch_to, add_leaf_to, AsTree};
use derivative::Derivative;

use crate::aggregate::AggregatedData;
use crate::versions::Snapshot;

pub mod avl;
pub mod treap;

pub type Link<K, Ag> = Option<Rc<Node<K, Ag>>>;

/// Immutable tree node. Once built it is never changed, so it can be shared by any number of versions.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Node<K, Ag: AggregatedData> {
    key: K,
    data: Ag::Data,
    /// Aggregated data for this node's subtree
    agg: Ag,
    size: usize,
    /// Height for AVL nodes, heap priority for treap nodes.
    meta: u64,
    /// Left and right child
    #[derivative(Debug = "ignore")]
    child: [Link<K, Ag>; 2],
}

impl<K, Ag: AggregatedData> Node<K, Ag> {
    pub(crate) fn new(key: K, data: Ag::Data, meta: u64, child: [Link<K, Ag>; 2]) -> Rc<Self> {
        let [l, r] = &child;
        let agg = agg(l).merge(Ag::from(&data)).merge(agg(r));
        let size = size(l) + 1 + size(r);
        Rc::new(Self {
            size,
            key,
            data,
            agg,
            meta,
            child,
        })
    }
    pub fn key(&self) -> &K {
        &self.key
    }
    pub fn data(&self) -> &Ag::Data {
        &self.data
    }
    pub fn agg(&self) -> &Ag {
        &self.agg
    }
    /// Number of nodes in this subtree.
    pub fn subtree_size(&self) -> usize {
        self.size
    }
    fn entry(&self) -> (&K, &Ag::Data) {
        (&self.key, &self.data)
    }
}

pub(crate) fn size<K, Ag: AggregatedData>(u: &Link<K, Ag>) -> usize {
    u.as_ref().map_or(0, |n| n.size)
}

pub(crate) fn agg<K, Ag: AggregatedData>(u: &Link<K, Ag>) -> Ag {
    u.as_ref().map_or_else(Ag::default, |n| n.agg.clone())
}

pub(crate) fn meta<K, Ag: AggregatedData>(u: &Link<K, Ag>) -> u64 {
    u.as_ref().map_or(0, |n| n.meta)
}

pub(crate) fn alg_panic() -> ! {
    panic!("PersistentBst algorithm incorrect")
}

fn after_start<Q: Ord + ?Sized>(key: &Q, start: Bound<&Q>) -> bool {
    match start {
        Bound::Included(s) => key >= s,
        Bound::Excluded(s) => key > s,
        Bound::Unbounded => true,
    }
}

fn before_end<Q: Ord + ?Sized>(key: &Q, end: Bound<&Q>) -> bool {
    match end {
        Bound::Included(e) => key <= e,
        Bound::Excluded(e) => key < e,
        Bound::Unbounded => true,
    }
}

fn find<'a, K, Ag, Q>(mut u: &'a Link<K, Ag>, key: &Q) -> Option<&'a Node<K, Ag>>
where
    K: Borrow<Q>,
    Ag: AggregatedData,
    Q: Ord + ?Sized,
{
    while let Some(n) = u {
        u = match key.cmp(n.key.borrow()) {
            Ordering::Equal => return Some(n),
            Ordering::Less => &n.child[0],
            Ordering::Greater => &n.child[1],
        }
    }
    None
}

fn range_agg_inner<K, Ag, Q>(u: &Link<K, Ag>, start: Bound<&Q>, end: Bound<&Q>) -> Ag
where
    K: Borrow<Q>,
    Ag: AggregatedData,
    Q: Ord + ?Sized,
{
    let Some(n) = u else {
        return Ag::default();
    };
    if let (Bound::Unbounded, Bound::Unbounded) = (start, end) {
        return n.agg.clone();
    }
    let key = n.key.borrow();
    if !after_start(key, start) {
        return range_agg_inner(&n.child[1], start, end);
    }
    if !before_end(key, end) {
        return range_agg_inner(&n.child[0], start, end);
    }
    // Everything left of the node is below `end`, everything right is above `start`.
    range_agg_inner(&n.child[0], start, Bound::Unbounded)
        .merge(Ag::from(&n.data))
        .merge(range_agg_inner(&n.child[1], Bound::Unbounded, end))
}

/// Path copy with the data of `key` changed. None if the key is absent.
fn mutate_inner<K, Ag, Q>(
    u: &Link<K, Ag>,
    key: &Q,
    f: impl FnOnce(&mut Ag::Data),
) -> Option<Rc<Node<K, Ag>>>
where
    K: Borrow<Q> + Clone,
    Ag: AggregatedData,
    Q: Ord + ?Sized,
{
    let n = u.as_deref()?;
    let [l, r] = n.child.clone();
    let (data, child) = match key.cmp(n.key.borrow()) {
        Ordering::Less => (n.data.clone(), [Some(mutate_inner(&l, key, f)?), r]),
        Ordering::Greater => (n.data.clone(), [l, Some(mutate_inner(&r, key, f)?)]),
        Ordering::Equal => {
            let mut data = n.data.clone();
            f(&mut data);
            (data, [l, r])
        }
    };
    Some(Node::new(n.key.clone(), data, n.meta, child))
}

fn depth<K, Ag: AggregatedData>(u: &Link<K, Ag>) -> usize {
    u.as_ref()
        .map_or(0, |n| 1 + depth(&n.child[0]).max(depth(&n.child[1])))
}

fn collect_ptrs<K, Ag: AggregatedData>(u: &Link<K, Ag>, seen: &mut HashSet<*const Node<K, Ag>>) {
    if let Some(n) = u {
        if seen.insert(Rc::as_ptr(n)) {
            collect_ptrs(&n.child[0], seen);
            collect_ptrs(&n.child[1], seen);
        }
    }
}

fn count_unshared<K, Ag: AggregatedData>(
    u: &Link<K, Ag>,
    shared: &HashSet<*const Node<K, Ag>>,
) -> usize {
    match u {
        // A shared node is never rebuilt, so its whole subtree is shared too.
        Some(n) if !shared.contains(&Rc::as_ptr(n)) => {
            1 + count_unshared(&n.child[0], shared) + count_unshared(&n.child[1], shared)
        }
        _ => 0,
    }
}

pub(crate) fn tree_preorder_dbg<K: Debug, Ag: AggregatedData, T: AsTree>(u: &Link<K, Ag>, tree: &T) {
    let Some(n) = u else {
        add_leaf_to!(*tree, "∅");
        return;
    };
    add_branch_to!(*tree, "{n:?}");
    if n.child[0].is_none() && n.child[1].is_none() {
        return;
    }
    for c in &n.child {
        tree_preorder_dbg(c, tree);
    }
}

/// In-order iterator over the entries of one version.
pub struct Iter<'a, K, Ag: AggregatedData> {
    stack: Vec<&'a Node<K, Ag>>,
}

impl<'a, K, Ag: AggregatedData> Iter<'a, K, Ag> {
    /// Positions the iterator on the first key that is not before `start`.
    fn seek<Q>(mut u: &'a Link<K, Ag>, start: Bound<&Q>) -> Self
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut stack = vec![];
        while let Some(n) = u {
            if after_start(n.key.borrow(), start) {
                stack.push(&**n);
                u = &n.child[0];
            } else {
                u = &n.child[1];
            }
        }
        Self { stack }
    }
}

impl<'a, K, Ag: AggregatedData> Iterator for Iter<'a, K, Ag> {
    type Item = (&'a K, &'a Ag::Data);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        let mut u = &n.child[1];
        while let Some(c) = u {
            self.stack.push(c);
            u = &c.child[0];
        }
        Some(n.entry())
    }
}

/// A persistent ordered map. Every mutation returns a new version and leaves `self` untouched;
/// only the nodes on the search path are rebuilt, the rest is shared with `self`.
pub trait PersistentBst<K, Ag = ()>
where
    K: Ord + Clone + Debug,
    Ag: AggregatedData,
    Self: Snapshot + Debug,
{
    fn new_empty() -> Self;
    fn root(&self) -> &Link<K, Ag>;
    /// A version with the given root and the same balancing state as `self`.
    fn with_root(&self, root: Link<K, Ag>) -> Self;
    /// Path-copying insert. Returns the new root, or None if the key is already present.
    fn path_insert(&self, key: K, data: Ag::Data) -> Option<Rc<Node<K, Ag>>>;
    /// Path-copying removal. Returns the new root, or None if the key is absent.
    fn path_remove<Q>(&self, key: &Q) -> Option<Link<K, Ag>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized;

    fn from_entries(entries: impl IntoIterator<Item = (K, Ag::Data)>) -> Self {
        entries
            .into_iter()
            .fold(Self::new_empty(), |t, (k, d)| t.insert(k, d))
    }

    // MUTATIONS
    // They never touch nodes of existing versions. A no-op returns a version that is `same_as` self.

    /// Inserts a key. No-op if the key is already present, the old data is kept.
    fn insert(&self, key: K, data: Ag::Data) -> Self {
        log::trace!("insert {key:?} into version of size {}", self.len());
        match self.path_insert(key, data) {
            Some(root) => self.with_root(Some(root)),
            None => self.clone(),
        }
    }
    /// Inserts into a set.
    fn add(&self, key: K) -> Self
    where
        Ag: AggregatedData<Data = ()>,
    {
        self.insert(key, ())
    }
    /// Removes a key. No-op if the key is absent.
    fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.path_remove(key) {
            Some(root) => self.with_root(root),
            None => self.clone(),
        }
    }
    /// Changes the data associated with key. No-op if the key is absent.
    fn mutate_data<Q>(&self, key: &Q, f: impl FnOnce(&mut Ag::Data)) -> Self
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match mutate_inner(self.root(), key, f) {
            Some(root) => self.with_root(Some(root)),
            None => self.clone(),
        }
    }

    // QUERIES

    fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        find(self.root(), key).is_some()
    }
    fn get<'a, Q>(&'a self, key: &Q) -> Option<&'a Ag::Data>
    where
        K: Borrow<Q> + 'a,
        Q: Ord + ?Sized,
        Ag: 'a,
    {
        find(self.root(), key).map(|n| &n.data)
    }
    fn len(&self) -> usize {
        size(self.root())
    }
    fn is_empty(&self) -> bool {
        self.root().is_none()
    }
    /// K-th smallest entry (0-indexed).
    fn find_kth<'a>(&'a self, mut k: usize) -> Option<(&'a K, &'a Ag::Data)>
    where
        K: 'a,
        Ag: 'a,
    {
        let mut u = self.root();
        while let Some(n) = u {
            let sl = size(&n.child[0]);
            match k.cmp(&sl) {
                Ordering::Less => u = &n.child[0],
                Ordering::Equal => return Some(n.entry()),
                Ordering::Greater => {
                    k -= sl + 1;
                    u = &n.child[1];
                }
            }
        }
        None
    }
    fn first<'a>(&'a self) -> Option<(&'a K, &'a Ag::Data)>
    where
        K: 'a,
        Ag: 'a,
    {
        self.find_kth(0)
    }
    fn last<'a>(&'a self) -> Option<(&'a K, &'a Ag::Data)>
    where
        K: 'a,
        Ag: 'a,
    {
        self.len().checked_sub(1).and_then(|k| self.find_kth(k))
    }
    /// Number of keys strictly smaller than key.
    fn rank<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut u = self.root();
        let mut ord = 0;
        while let Some(n) = u {
            if n.key.borrow() < key {
                ord += size(&n.child[0]) + 1;
                u = &n.child[1];
            } else {
                u = &n.child[0];
            }
        }
        ord
    }
    /// Position of key in sorted order, 0-indexed. None if key is absent.
    fn order<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.contains(key).then(|| self.rank(key))
    }
    /// Smallest entry with key >= the given key.
    fn lower_bound<'a, Q>(&'a self, key: &Q) -> Option<(&'a K, &'a Ag::Data)>
    where
        K: Borrow<Q> + 'a,
        Q: Ord + ?Sized,
        Ag: 'a,
    {
        Iter::seek(self.root(), Bound::Included(key)).next()
    }
    /// Smallest entry with key > the given key.
    fn upper_bound<'a, Q>(&'a self, key: &Q) -> Option<(&'a K, &'a Ag::Data)>
    where
        K: Borrow<Q> + 'a,
        Q: Ord + ?Sized,
        Ag: 'a,
    {
        Iter::seek(self.root(), Bound::Excluded(key)).next()
    }
    fn iter<'a>(&'a self) -> Iter<'a, K, Ag>
    where
        K: 'a,
        Ag: 'a,
    {
        Iter::seek::<K>(self.root(), Bound::Unbounded)
    }
    fn keys<'a>(&'a self) -> impl Iterator<Item = &'a K>
    where
        K: 'a,
        Ag: 'a,
    {
        self.iter().map(|(k, _)| k)
    }
    /// Entries whose key is in range, in order.
    fn range<'a, Q, R>(&'a self, range: R) -> impl Iterator<Item = (&'a K, &'a Ag::Data)>
    where
        K: Borrow<Q> + 'a,
        Q: Ord + ?Sized + 'a,
        R: RangeBounds<Q> + 'a,
        Ag: 'a,
    {
        Iter::seek(self.root(), range.start_bound())
            .take_while(move |(k, _)| before_end((*k).borrow(), range.end_bound()))
    }
    /// Aggregated data of all the keys in range. The identity if the range is empty.
    fn range_agg<Q>(&self, range: impl RangeBounds<Q>) -> Ag
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        range_agg_inner(self.root(), range.start_bound(), range.end_bound())
    }
    fn total_agg(&self) -> Ag {
        agg(self.root())
    }
    /// Number of nodes on the longest root to leaf path.
    fn depth(&self) -> usize {
        depth(self.root())
    }
    /// Nodes reachable from this version that are not shared with `base`.
    fn unshared_nodes(&self, base: &Self) -> usize {
        let mut shared = HashSet::new();
        collect_ptrs(base.root(), &mut shared);
        count_unshared(self.root(), &shared)
    }
}
