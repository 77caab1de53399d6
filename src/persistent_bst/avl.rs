use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use debug_tree::TreeBuilder;
use derivative::Derivative;

use super::{alg_panic, meta as height, tree_preorder_dbg, Link, Node, PersistentBst};
use crate::aggregate::AggregatedData;
use crate::versions::Snapshot;

/// Height balanced persistent tree. Depth is at most ~1.44 log2(n + 2) in the worst case.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct AvlTree<K, Ag: AggregatedData = ()> {
    root: Link<K, Ag>,
}

impl<K: Debug, Ag: AggregatedData> Debug for AvlTree<K, Ag> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let builder = TreeBuilder::new();
        let _b = builder.add_branch("AvlTree");
        tree_preorder_dbg(&self.root, &builder);
        writeln!(f, "{}", builder.string())
    }
}

/// New node whose height is computed from its children. Does not rebalance.
fn mk<K, Ag: AggregatedData>(key: K, data: Ag::Data, l: Link<K, Ag>, r: Link<K, Ag>) -> Rc<Node<K, Ag>> {
    let h = 1 + height(&l).max(height(&r));
    Node::new(key, data, h, [l, r])
}

/// Copy of `n` as a (key, data) pair, to rebuild it elsewhere.
fn kd<K: Clone, Ag: AggregatedData>(n: &Node<K, Ag>) -> (K, Ag::Data) {
    (n.key.clone(), n.data.clone())
}

/// Joins l, (key, data) and r, where the heights of l and r differ by at most 2.
/// Rotations build new nodes, the old ones stay valid for older versions.
fn rebalance<K: Clone, Ag: AggregatedData>(
    l: Link<K, Ag>,
    key: K,
    data: Ag::Data,
    r: Link<K, Ag>,
) -> Rc<Node<K, Ag>> {
    let (hl, hr) = (height(&l), height(&r));
    if hl > hr + 1 {
        let Some(ln) = l.as_deref() else { alg_panic() };
        let [ll, lr] = &ln.child;
        let (lk, ld) = kd(ln);
        if height(ll) >= height(lr) {
            // Single right rotation
            mk(lk, ld, ll.clone(), Some(mk(key, data, lr.clone(), r)))
        } else {
            // Left-right double rotation
            let Some(lrn) = lr.as_deref() else { alg_panic() };
            let (lrk, lrd) = kd(lrn);
            let [lrl, lrr] = lrn.child.clone();
            mk(
                lrk,
                lrd,
                Some(mk(lk, ld, ll.clone(), lrl)),
                Some(mk(key, data, lrr, r)),
            )
        }
    } else if hr > hl + 1 {
        let Some(rn) = r.as_deref() else { alg_panic() };
        let [rl, rr] = &rn.child;
        let (rk, rd) = kd(rn);
        if height(rr) >= height(rl) {
            // Single left rotation
            mk(rk, rd, Some(mk(key, data, l, rl.clone())), rr.clone())
        } else {
            // Right-left double rotation
            let Some(rln) = rl.as_deref() else { alg_panic() };
            let (rlk, rld) = kd(rln);
            let [rll, rlr] = rln.child.clone();
            mk(
                rlk,
                rld,
                Some(mk(key, data, l, rll)),
                Some(mk(rk, rd, rlr, rr.clone())),
            )
        }
    } else {
        mk(key, data, l, r)
    }
}

fn insert_inner<K: Ord + Clone, Ag: AggregatedData>(
    u: &Link<K, Ag>,
    key: K,
    data: Ag::Data,
) -> Option<Rc<Node<K, Ag>>> {
    let Some(n) = u else {
        return Some(mk(key, data, None, None));
    };
    let [l, r] = &n.child;
    match key.cmp(&n.key) {
        Ordering::Equal => None,
        Ordering::Less => {
            let new_l = insert_inner(l, key, data)?;
            let (nk, nd) = kd(n);
            Some(rebalance(Some(new_l), nk, nd, r.clone()))
        }
        Ordering::Greater => {
            let new_r = insert_inner(r, key, data)?;
            let (nk, nd) = kd(n);
            Some(rebalance(l.clone(), nk, nd, Some(new_r)))
        }
    }
}

/// Removes the smallest node of the subtree. Returns it and the new subtree.
fn remove_first<K: Clone, Ag: AggregatedData>(n: &Node<K, Ag>) -> (&Node<K, Ag>, Link<K, Ag>) {
    match &n.child {
        [None, r] => (n, r.clone()),
        [Some(l), r] => {
            let (first, rest) = remove_first(&**l);
            let (nk, nd) = kd(n);
            (first, Some(rebalance(rest, nk, nd, r.clone())))
        }
    }
}

fn remove_inner<K, Ag, Q>(u: &Link<K, Ag>, key: &Q) -> Option<Link<K, Ag>>
where
    K: Borrow<Q> + Clone,
    Ag: AggregatedData,
    Q: Ord + ?Sized,
{
    let n = u.as_deref()?;
    let [l, r] = &n.child;
    Some(match key.cmp(n.key.borrow()) {
        Ordering::Less => {
            let new_l = remove_inner(l, key)?;
            let (nk, nd) = kd(n);
            Some(rebalance(new_l, nk, nd, r.clone()))
        }
        Ordering::Greater => {
            let new_r = remove_inner(r, key)?;
            let (nk, nd) = kd(n);
            Some(rebalance(l.clone(), nk, nd, new_r))
        }
        Ordering::Equal => match (l, r) {
            (None, _) => r.clone(),
            (_, None) => l.clone(),
            (_, Some(rn)) => {
                // Two children: the in-order successor takes this node's place.
                let (succ, new_r) = remove_first(&**rn);
                let (sk, sd) = kd(succ);
                Some(rebalance(l.clone(), sk, sd, new_r))
            }
        },
    })
}

impl<K, Ag: AggregatedData> Snapshot for AvlTree<K, Ag> {
    fn same_as(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<K, Ag> PersistentBst<K, Ag> for AvlTree<K, Ag>
where
    K: Ord + Clone + Debug,
    Ag: AggregatedData,
{
    fn new_empty() -> Self {
        Self { root: None }
    }

    fn root(&self) -> &Link<K, Ag> {
        &self.root
    }

    fn with_root(&self, root: Link<K, Ag>) -> Self {
        Self { root }
    }

    fn path_insert(&self, key: K, data: Ag::Data) -> Option<Rc<Node<K, Ag>>> {
        insert_inner(&self.root, key, data)
    }

    fn path_remove<Q>(&self, key: &Q) -> Option<Link<K, Ag>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        log::trace!("avl remove from version of size {}", self.len());
        remove_inner(&self.root, key)
    }
}

impl<K, Ag> FromIterator<(K, Ag::Data)> for AvlTree<K, Ag>
where
    K: Ord + Clone + Debug,
    Ag: AggregatedData,
{
    fn from_iter<I: IntoIterator<Item = (K, Ag::Data)>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

impl<K, Ag> Default for AvlTree<K, Ag>
where
    K: Ord + Clone + Debug,
    Ag: AggregatedData,
{
    fn default() -> Self {
        Self::new_empty()
    }
}
