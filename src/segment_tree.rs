use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::ops::RangeBounds;
use std::rc::Rc;

use debug_tree::{add_branch_to, AsTree, TreeBuilder};
use derivative::Derivative;

use crate::aggregate::{range_to_lr, AggregatedData};
use crate::versions::Snapshot;

#[derive(Derivative)]
#[derivative(Debug)]
enum SegNode<Ag: AggregatedData> {
    Leaf(Ag::Data),
    Inner {
        agg: Ag,
        #[derivative(Debug = "ignore")]
        child: [Rc<SegNode<Ag>>; 2],
    },
}

impl<Ag: AggregatedData> SegNode<Ag> {
    fn inner(l: Rc<Self>, r: Rc<Self>) -> Rc<Self> {
        Rc::new(Self::Inner {
            agg: l.agg().merge(r.agg()),
            child: [l, r],
        })
    }
    fn agg(&self) -> Ag {
        match self {
            Self::Leaf(data) => Ag::from(data),
            Self::Inner { agg, .. } => agg.clone(),
        }
    }
}

fn alg_panic() -> ! {
    panic!("SegmentTree algorithm incorrect")
}

/// Node covering [lo, hi) splits at this position.
fn mid(lo: usize, hi: usize) -> usize {
    lo + (hi - lo) / 2
}

fn build<Ag: AggregatedData>(data: &[Ag::Data]) -> Rc<SegNode<Ag>> {
    if let [single] = data {
        return Rc::new(SegNode::Leaf(single.clone()));
    }
    let (l, r) = data.split_at(data.len() / 2);
    SegNode::inner(build(l), build(r))
}

fn set_inner<Ag: AggregatedData>(
    u: &Rc<SegNode<Ag>>,
    lo: usize,
    hi: usize,
    i: usize,
    f: impl FnOnce(&mut Ag::Data),
) -> Rc<SegNode<Ag>> {
    match &**u {
        SegNode::Leaf(data) => {
            let mut data = data.clone();
            f(&mut data);
            Rc::new(SegNode::Leaf(data))
        }
        SegNode::Inner { child: [l, r], .. } => {
            let m = mid(lo, hi);
            if i < m {
                SegNode::inner(set_inner(l, lo, m, i, f), r.clone())
            } else {
                SegNode::inner(l.clone(), set_inner(r, m, hi, i, f))
            }
        }
    }
}

fn range_agg_inner<Ag: AggregatedData>(u: &SegNode<Ag>, lo: usize, hi: usize, ql: usize, qr: usize) -> Ag {
    if qr <= lo || hi <= ql {
        return Ag::default();
    }
    if ql <= lo && hi <= qr {
        return u.agg();
    }
    let SegNode::Inner { child: [l, r], .. } = u else {
        // A leaf is always either fully inside or fully outside the query.
        alg_panic()
    };
    let m = mid(lo, hi);
    range_agg_inner(&**l, lo, m, ql, qr).merge(range_agg_inner(&**r, m, hi, ql, qr))
}

fn tree_dbg<Ag: AggregatedData, T: AsTree>(u: &SegNode<Ag>, lo: usize, hi: usize, tree: &T) {
    add_branch_to!(*tree, "[{lo}, {hi}) {u:?}");
    if let SegNode::Inner { child: [l, r], .. } = u {
        let m = mid(lo, hi);
        tree_dbg(&**l, lo, m, tree);
        tree_dbg(&**r, m, hi, tree);
    }
}

/// Persistent segment tree over positions `0..len`. A point update copies the path to one leaf and
/// shares everything else, so every old version keeps answering queries in O(log n).
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct SegmentTree<Ag: AggregatedData> {
    root: Option<Rc<SegNode<Ag>>>,
    len: usize,
}

impl<Ag: AggregatedData> Debug for SegmentTree<Ag> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let builder = TreeBuilder::new();
        let _b = builder.add_branch("SegmentTree");
        if let Some(root) = &self.root {
            tree_dbg(&**root, 0, self.len, &builder);
        }
        writeln!(f, "{}", builder.string())
    }
}

impl<Ag: AggregatedData> SegmentTree<Ag> {
    pub fn new_empty() -> Self {
        Self { root: None, len: 0 }
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    /// Data at position i.
    pub fn get(&self, i: usize) -> Option<&Ag::Data> {
        if i >= self.len {
            return None;
        }
        let mut u = self.root.as_deref()?;
        let (mut lo, mut hi) = (0, self.len);
        loop {
            match u {
                SegNode::Leaf(data) => return Some(data),
                SegNode::Inner { child: [l, r], .. } => {
                    let m = mid(lo, hi);
                    if i < m {
                        (u, hi) = (&**l, m);
                    } else {
                        (u, lo) = (&**r, m);
                    }
                }
            }
        }
    }
    /// New version with the data at position i changed. Panics if i is out of range.
    pub fn update(&self, i: usize, f: impl FnOnce(&mut Ag::Data)) -> Self {
        assert!(i < self.len, "position {i} out of range 0..{}", self.len);
        log::trace!("segment tree update at {i}");
        let Some(root) = &self.root else { alg_panic() };
        Self {
            root: Some(set_inner(root, 0, self.len, i, f)),
            len: self.len,
        }
    }
    /// New version with position i set to data. Panics if i is out of range.
    pub fn set(&self, i: usize, data: Ag::Data) -> Self {
        self.update(i, |d| *d = data)
    }
    /// Aggregated data of a range of positions. Positions past the end are ignored.
    pub fn range_agg(&self, range: impl RangeBounds<usize>) -> Ag {
        let [ql, qr] = range_to_lr(range, || self.len);
        match &self.root {
            Some(root) if ql < qr => range_agg_inner(&**root, 0, self.len, ql, qr),
            _ => Ag::default(),
        }
    }
    pub fn total_agg(&self) -> Ag {
        self.root.as_ref().map_or_else(Ag::default, |root| root.agg())
    }
    pub fn iter(&self) -> impl Iterator<Item = &Ag::Data> {
        let mut stack: Vec<&SegNode<Ag>> = self.root.as_deref().into_iter().collect();
        std::iter::from_fn(move || loop {
            match stack.pop()? {
                SegNode::Leaf(data) => return Some(data),
                SegNode::Inner { child: [l, r], .. } => {
                    stack.push(&**r);
                    stack.push(&**l);
                }
            }
        })
    }
    /// Nodes reachable from this version that are not shared with `base`.
    pub fn unshared_nodes(&self, base: &Self) -> usize {
        fn collect<Ag: AggregatedData>(u: &Rc<SegNode<Ag>>, seen: &mut HashSet<*const SegNode<Ag>>) {
            if seen.insert(Rc::as_ptr(u)) {
                if let SegNode::Inner { child, .. } = &**u {
                    child.iter().for_each(|c| collect(c, seen));
                }
            }
        }
        fn count<Ag: AggregatedData>(u: &Rc<SegNode<Ag>>, shared: &HashSet<*const SegNode<Ag>>) -> usize {
            if shared.contains(&Rc::as_ptr(u)) {
                return 0;
            }
            match &**u {
                SegNode::Leaf(_) => 1,
                SegNode::Inner { child, .. } => 1 + child.iter().map(|c| count(c, shared)).sum::<usize>(),
            }
        }
        let mut shared = HashSet::new();
        if let Some(root) = &base.root {
            collect(root, &mut shared);
        }
        self.root.as_ref().map_or(0, |root| count(root, &shared))
    }
}

impl<Ag: AggregatedData> FromIterator<Ag::Data> for SegmentTree<Ag> {
    fn from_iter<I: IntoIterator<Item = Ag::Data>>(iter: I) -> Self {
        let data: Vec<_> = iter.into_iter().collect();
        log::debug!("building segment tree over {} positions", data.len());
        Self {
            root: (!data.is_empty()).then(|| build(&data)),
            len: data.len(),
        }
    }
}

impl<Ag: AggregatedData> Snapshot for SegmentTree<Ag> {
    fn same_as(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}
