use persistent_trees::aggregate::{Min, Sum};
use persistent_trees::{Snapshot, SubtreeQuery};
use rand::prelude::*;

mod common;

const VALUES: [i64; 10] = [1, 4, 5, 6, 3, 5, 6, 8, 2, 4];
//       0
//       |
//       1
//     /   \
//    2     3
//   / \   / \
//  4   5 6   7
// / \
// 8  9
const PARENT: [usize; 10] = [0, 0, 1, 1, 2, 2, 3, 3, 4, 4];

#[test]
fn test_subtree_min() {
    let t: SubtreeQuery<Min<i64>> = SubtreeQuery::new(VALUES.to_vec(), 0, &PARENT);
    assert_eq!(t.len(), 10);
    assert_eq!(t.subtree_agg(1), Min(Some(2)));
    assert_eq!(t.subtree_agg(0), Min(Some(1)));
    assert_eq!(t.subtree_agg(3), Min(Some(6)));
    assert_eq!(t.subtree_agg(4), Min(Some(2)));
    assert_eq!(t.subtree_agg(9), Min(Some(4)));
    assert_eq!(t.get(8), Some(&2));
    let t2 = t.set(8, 1);
    assert_eq!(t2.get(8), Some(&1));
    assert_eq!(t2.subtree_agg(1), Min(Some(1)));
    assert_eq!(t2.subtree_agg(3), Min(Some(6)));
    // The old version is unchanged.
    assert_eq!(t.get(8), Some(&2));
    assert_eq!(t.subtree_agg(1), Min(Some(2)));
    assert!(!t2.same_as(&t));
    assert!(t.clone().same_as(&t));
}

#[test]
fn test_shape() {
    let t: SubtreeQuery<Sum<i64>> = SubtreeQuery::new(VALUES.to_vec(), 0, &PARENT);
    assert_eq!(t.subtree_size(0), 10);
    assert_eq!(t.subtree_size(2), 5);
    assert_eq!(t.subtree_size(7), 1);
    assert!(t.is_ancestor(1, 8));
    assert!(t.is_ancestor(4, 4));
    assert!(!t.is_ancestor(3, 8));
    assert!(!t.is_ancestor(8, 4));
    assert_eq!(t.subtree_agg(2), Sum(5 + 3 + 5 + 2 + 4));
    assert_eq!(t.update(5, |v| *v += 10).subtree_agg(2), Sum(29));
    assert_eq!(t.get(10), None);
}

#[test]
fn test_other_root() {
    // Same edges, rooted at 8 instead.
    let parent = [1, 2, 4, 1, 8, 2, 3, 3, 8, 4];
    let t: SubtreeQuery<Sum<i64>> = SubtreeQuery::new(VALUES.to_vec(), 8, &parent);
    assert_eq!(t.subtree_size(8), 10);
    assert_eq!(t.subtree_size(4), 9);
    assert_eq!(t.subtree_size(9), 1);
    assert_eq!(t.subtree_agg(1), Sum(1 + 4 + 6 + 6 + 8));
}

#[test]
#[should_panic(expected = "not a tree")]
fn test_cycle_is_rejected() {
    SubtreeQuery::<Sum<i64>>::new(vec![1, 2, 3, 4], 0, &[0, 2, 3, 1]);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_node_out_of_range() {
    SubtreeQuery::<Sum<i64>>::new(vec![1, 2], 0, &[0, 0]).subtree_agg(2);
}

/// Subtree sum by walking parents, the slow way.
fn slow_subtree_sum(values: &[i64], parent: &[usize], root: usize, u: usize) -> i64 {
    (0..values.len())
        .filter(|&v| {
            let mut w = v;
            loop {
                if w == u {
                    return true;
                }
                if w == root {
                    return false;
                }
                w = parent[w];
            }
        })
        .map(|v| values[v])
        .sum()
}

#[test]
fn test_random_trees() {
    common::init_logger();
    let rng = &mut StdRng::seed_from_u64(606);
    for n in [1, 2, 7, 30, 100] {
        let root = rng.gen_range(0..n);
        let mut labels: Vec<usize> = (0..n).filter(|&u| u != root).collect();
        labels.shuffle(rng);
        let mut parent = vec![root; n];
        let mut placed = vec![root];
        for &u in &labels {
            parent[u] = placed[rng.gen_range(0..placed.len())];
            placed.push(u);
        }
        let mut values: Vec<i64> = (0..n).map(|_| rng.gen_range(-100..100)).collect();
        let mut versions = vec![(SubtreeQuery::<Sum<i64>>::new(values.clone(), root, &parent), values.clone())];
        for _ in 0..20 {
            let u = rng.gen_range(0..n);
            let x = rng.gen_range(-100..100);
            values[u] = x;
            let next = versions[versions.len() - 1].0.set(u, x);
            versions.push((next, values.clone()));
        }
        for (t, vals) in &versions {
            for u in 0..n {
                assert_eq!(t.subtree_agg(u), Sum(slow_subtree_sum(vals, &parent, root, u)));
            }
        }
    }
}
