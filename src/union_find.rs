use std::fmt::Debug;

use crate::aggregate::Opaque;
use crate::segment_tree::SegmentTree;
use crate::versions::Snapshot;

/// Persistent disjoint set union over `0..n`. Union by rank without path compression, so finds
/// never write and every old version stays valid. `find` is O(log^2 n).
#[derive(Clone)]
pub struct PersistentUnionFind {
    parent: SegmentTree<Opaque<usize>>,
    rank: SegmentTree<Opaque<u32>>,
}

impl Debug for PersistentUnionFind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries((0..self.len()).map(|u| (u, self.find(u))))
            .finish()
    }
}

impl PersistentUnionFind {
    /// n singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: std::iter::repeat(0).take(n).collect(),
        }
    }
    pub fn len(&self) -> usize {
        self.parent.len()
    }
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
    fn parent(&self, u: usize) -> usize {
        match self.parent.get(u) {
            Some(&p) => p,
            None => panic!("element {u} out of range 0..{}", self.len()),
        }
    }
    fn rank(&self, u: usize) -> u32 {
        self.rank.get(u).copied().unwrap_or_default()
    }
    /// Representative of the set containing u. Panics if u is out of range.
    pub fn find(&self, mut u: usize) -> usize {
        loop {
            let p = self.parent(u);
            if p == u {
                return u;
            }
            u = p;
        }
    }
    pub fn same_set(&self, u: usize, v: usize) -> bool {
        self.find(u) == self.find(v)
    }
    /// Joins the sets of u and v. Returns a version `same_as` self if they are already joined.
    pub fn union(&self, u: usize, v: usize) -> Self {
        let (ru, rv) = (self.find(u), self.find(v));
        if ru == rv {
            return self.clone();
        }
        let (ku, kv) = (self.rank(ru), self.rank(rv));
        log::trace!("union {u} {v}: roots {ru} (rank {ku}) {rv} (rank {kv})");
        let (child, root) = if ku < kv { (ru, rv) } else { (rv, ru) };
        Self {
            parent: self.parent.set(child, root),
            rank: if ku == kv {
                self.rank.set(root, ku + 1)
            } else {
                self.rank.clone()
            },
        }
    }
}

impl Snapshot for PersistentUnionFind {
    fn same_as(&self, other: &Self) -> bool {
        self.parent.same_as(&other.parent) && self.rank.same_as(&other.rank)
    }
}
