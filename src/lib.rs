pub mod aggregate;
pub mod persistent_bst;
pub mod segment_tree;
pub mod stack;
pub mod subtree_query;
pub mod union_find;
pub mod versions;

pub use aggregate::AggregatedData;
pub use persistent_bst::{avl::AvlTree, treap::Treap, PersistentBst};
pub use segment_tree::SegmentTree;
pub use subtree_query::SubtreeQuery;
pub use versions::{Snapshot, VersionId, VersionTable};

/// The persistent ordered map with the best worst case guarantees on this crate.
pub type PersistentMap<K, Ag = ()> = AvlTree<K, Ag>;
/// Persistent ordered set.
pub type PersistentSet<K> = AvlTree<K, ()>;
