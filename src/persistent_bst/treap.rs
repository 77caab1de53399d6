use std::borrow::Borrow;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use debug_tree::TreeBuilder;
use derivative::Derivative;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{tree_preorder_dbg, Link, Node, PersistentBst};
use crate::aggregate::AggregatedData;
use crate::versions::Snapshot;

/// Seed used by `Treap::new_empty`.
pub const DEFAULT_SEED: u64 = 2012;

/// Persistent treap. Each node gets a random priority when created and the tree is a heap on
/// priorities, which gives expected O(log n) depth.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct Treap<K, Ag: AggregatedData = ()> {
    root: Link<K, Ag>,
    /// Shared by every version derived from the same empty treap.
    rng: Rc<RefCell<StdRng>>,
}

impl<K: Debug, Ag: AggregatedData> Debug for Treap<K, Ag> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let builder = TreeBuilder::new();
        let _b = builder.add_branch("Treap");
        tree_preorder_dbg(&self.root, &builder);
        writeln!(f, "{}", builder.string())
    }
}

impl<K, Ag: AggregatedData> Treap<K, Ag> {
    /// Empty treap whose priorities come from a generator seeded with `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            root: None,
            rng: Rc::new(RefCell::new(StdRng::seed_from_u64(seed))),
        }
    }
    fn priority(&self) -> u64 {
        self.rng.borrow_mut().gen()
    }
}

fn copy_with<K: Clone, Ag: AggregatedData>(n: &Node<K, Ag>, child: [Link<K, Ag>; 2]) -> Link<K, Ag> {
    Some(Node::new(n.key.clone(), n.data.clone(), n.meta, child))
}

/// (keys < key, keys > key), or None if key is present. Only nodes on the search path are copied.
fn split<K, Ag, Q>(u: &Link<K, Ag>, key: &Q) -> Option<(Link<K, Ag>, Link<K, Ag>)>
where
    K: Borrow<Q> + Clone,
    Ag: AggregatedData,
    Q: Ord + ?Sized,
{
    let Some(n) = u else {
        return Some((None, None));
    };
    let [l, r] = &n.child;
    match key.cmp(n.key.borrow()) {
        Ordering::Equal => None,
        Ordering::Less => {
            let (ll, lr) = split(l, key)?;
            Some((ll, copy_with(n, [lr, r.clone()])))
        }
        Ordering::Greater => {
            let (rl, rr) = split(r, key)?;
            Some((copy_with(n, [l.clone(), rl]), rr))
        }
    }
}

/// Descends while the new priority is not larger, then splits the rest of the subtree around the new
/// node. None if key is present.
fn insert_inner<K: Ord + Clone, Ag: AggregatedData>(
    u: &Link<K, Ag>,
    key: K,
    data: Ag::Data,
    priority: u64,
) -> Option<Rc<Node<K, Ag>>> {
    match u {
        Some(n) if n.meta >= priority => {
            let [l, r] = &n.child;
            let child = match key.cmp(&n.key) {
                Ordering::Equal => return None,
                Ordering::Less => [Some(insert_inner(l, key, data, priority)?), r.clone()],
                Ordering::Greater => [l.clone(), Some(insert_inner(r, key, data, priority)?)],
            };
            Some(Node::new(n.key.clone(), n.data.clone(), n.meta, child))
        }
        _ => {
            let (l, r) = split(u, &key)?;
            Some(Node::new(key, data, priority, [l, r]))
        }
    }
}

/// Replaces the node with key by the merge of its children. None if key is absent.
fn remove_inner<K, Ag, Q>(u: &Link<K, Ag>, key: &Q) -> Option<Link<K, Ag>>
where
    K: Borrow<Q> + Clone,
    Ag: AggregatedData,
    Q: Ord + ?Sized,
{
    let n = u.as_deref()?;
    let [l, r] = &n.child;
    Some(match key.cmp(n.key.borrow()) {
        Ordering::Equal => merge(l.clone(), r.clone()),
        Ordering::Less => copy_with(n, [remove_inner(l, key)?, r.clone()]),
        Ordering::Greater => copy_with(n, [l.clone(), remove_inner(r, key)?]),
    })
}

/// Concat two treaps, assume all keys of u are smaller than all keys of v.
fn merge<K: Clone, Ag: AggregatedData>(u: Link<K, Ag>, v: Link<K, Ag>) -> Link<K, Ag> {
    match (u, v) {
        (None, v) => v,
        (u, None) => u,
        (Some(u), Some(v)) => {
            if u.meta > v.meta {
                let [ul, ur] = u.child.clone();
                copy_with(&u, [ul, merge(ur, Some(v))])
            } else {
                let [vl, vr] = v.child.clone();
                copy_with(&v, [merge(Some(u), vl), vr])
            }
        }
    }
}

impl<K, Ag: AggregatedData> Snapshot for Treap<K, Ag> {
    fn same_as(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<K, Ag> PersistentBst<K, Ag> for Treap<K, Ag>
where
    K: Ord + Clone + Debug,
    Ag: AggregatedData,
{
    fn new_empty() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    fn root(&self) -> &Link<K, Ag> {
        &self.root
    }

    fn with_root(&self, root: Link<K, Ag>) -> Self {
        Self {
            root,
            rng: self.rng.clone(),
        }
    }

    fn path_insert(&self, key: K, data: Ag::Data) -> Option<Rc<Node<K, Ag>>> {
        let priority = self.priority();
        log::trace!("treap insert {key:?} with priority {priority}");
        insert_inner(&self.root, key, data, priority)
    }

    fn path_remove<Q>(&self, key: &Q) -> Option<Link<K, Ag>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        log::trace!("treap remove from version of size {}", self.len());
        remove_inner(&self.root, key)
    }
}

impl<K, Ag> FromIterator<(K, Ag::Data)> for Treap<K, Ag>
where
    K: Ord + Clone + Debug,
    Ag: AggregatedData,
{
    fn from_iter<I: IntoIterator<Item = (K, Ag::Data)>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

impl<K, Ag> Default for Treap<K, Ag>
where
    K: Ord + Clone + Debug,
    Ag: AggregatedData,
{
    fn default() -> Self {
        Self::new_empty()
    }
}
