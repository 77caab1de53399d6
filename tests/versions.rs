use persistent_trees::versions::VersionError;
use persistent_trees::{PersistentBst, PersistentSet, Snapshot, VersionId, VersionTable};

mod common;

fn keys(t: &PersistentSet<i32>) -> Vec<i32> {
    t.keys().copied().collect()
}

#[test]
fn test_history() {
    common::init_logger();
    let mut table = VersionTable::new(PersistentSet::<i32>::new_empty());
    let v0 = table.initial();
    let v1 = table.derive(v0, |t| t.add(10));
    let v2 = table.derive(v1, |t| t.add(5));
    let v3 = table.derive(v2, |t| t.add(15));
    assert_eq!([v0, v1, v2, v3].map(VersionId::index), [0, 1, 2, 3]);
    assert_eq!(table.latest(), v3);
    assert_eq!(keys(&table[v3]), [5, 10, 15]);
    assert_eq!(keys(&table[v1]), [10]);
    let v4 = table.derive(v3, |t| t.remove(&10));
    assert_eq!(keys(&table[v4]), [5, 15]);
    assert_eq!(keys(&table[v3]), [5, 10, 15]);
    // Branching off an old version leaves the newer ones alone.
    let v5 = table.derive(v1, |t| t.add(1));
    assert_eq!(keys(&table[v5]), [1, 10]);
    assert_eq!(keys(&table[v4]), [5, 15]);
    assert_eq!(table.len(), 6);
}

#[test]
fn test_no_op_creates_no_version() {
    let mut table = VersionTable::new(PersistentSet::<i32>::new_empty());
    let v1 = table.derive(table.initial(), |t| t.add(3));
    assert_eq!(table.derive(v1, |t| t.add(3)), v1);
    assert_eq!(table.derive(v1, |t| t.remove(&4)), v1);
    assert_eq!(table.derive(v1, PersistentSet::clone), v1);
    assert_eq!(table.len(), 2);
    // commit always appends, even an identical snapshot.
    let same = table[v1].clone();
    let v2 = table.commit(same);
    assert_ne!(v2, v1);
    assert!(table[v2].same_as(&table[v1]));
}

#[test]
fn test_revert() {
    let mut table = VersionTable::new(PersistentSet::<i32>::new_empty());
    let v1 = table.derive(table.initial(), |t| t.add(1));
    let v2 = table.derive(v1, |t| t.add(2));
    let v3 = table.revert(v1);
    assert_eq!(table.latest(), v3);
    assert!(table[v3].same_as(&table[v1]));
    assert_eq!(keys(&table[v2]), [1, 2]);
    let v4 = table.derive(table.latest(), |t| t.add(7));
    assert_eq!(keys(&table[v4]), [1, 7]);
    let ids: Vec<_> = table.iter().map(|(v, t)| (v.to_string(), t.len())).collect();
    assert_eq!(
        ids,
        [("v0", 0), ("v1", 1), ("v2", 2), ("v3", 1), ("v4", 2)].map(|(v, n)| (v.to_owned(), n))
    );
}

#[test]
fn test_unknown_version() {
    let mut other = VersionTable::new(PersistentSet::<i32>::new_empty());
    let foreign = other.commit(other[other.initial()].add(1));
    let table = VersionTable::new(PersistentSet::<i32>::new_empty());
    let err = table.try_get(foreign).unwrap_err();
    assert_eq!(err, VersionError::Unknown { id: foreign, len: 1 });
    assert_eq!(err.to_string(), "unknown version v1 (table has 1 versions)");
    assert!(table.try_get(table.initial()).is_ok());
}

#[test]
fn test_version_from_other_table_in_range() {
    let mut a = VersionTable::new(PersistentSet::<i32>::new_empty());
    let foreign = a.derive(a.initial(), |t| t.add(99));
    let mut b = VersionTable::new(PersistentSet::<i32>::new_empty());
    for k in 1..3 {
        b.derive(b.latest(), |t| t.add(k));
    }
    assert_eq!(b.len(), 3);
    assert_eq!(foreign.index(), 1);
    assert_eq!(
        b.try_get(foreign).unwrap_err(),
        VersionError::Unknown { id: foreign, len: 3 }
    );
    assert!(b.try_get(b.initial()).is_ok());
    assert!(a.try_get(b.initial()).is_err());
    assert_eq!(keys(&a[foreign]), [99]);
}

#[test]
#[should_panic(expected = "unknown version v1")]
fn test_version_from_other_table_panics() {
    let mut a = VersionTable::new(PersistentSet::<i32>::new_empty());
    let foreign = a.derive(a.initial(), |t| t.add(1));
    let mut b = VersionTable::new(PersistentSet::<i32>::new_empty());
    b.derive(b.initial(), |t| t.add(2));
    let _ = &b[foreign];
}

#[test]
#[should_panic(expected = "unknown version v3")]
fn test_unknown_version_panics() {
    let mut other = VersionTable::new(PersistentSet::<i32>::new_empty());
    let mut v = other.initial();
    for k in 0..3 {
        v = other.derive(v, |t| t.add(k));
    }
    let table = VersionTable::new(PersistentSet::<i32>::new_empty());
    let _ = &table[v];
}
