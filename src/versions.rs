use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

/// A handle to one version of a persistent structure. Cloning is O(1) and shares everything.
pub trait Snapshot: Clone {
    /// O(1), not content equality. True if both handles point to the very same version.
    fn same_as(&self, other: &Self) -> bool;
}

/// Tags handed to tables, so an id is only accepted by the table that produced it.
static NEXT_TABLE: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId {
    table: usize,
    index: usize,
}

impl VersionId {
    /// Position in the history of its table.
    pub fn index(self) -> usize {
        self.index
    }
}

impl Display for VersionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.index)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    /// The id was never handed out by this table.
    #[error("unknown version {id} (table has {len} versions)")]
    Unknown { id: VersionId, len: usize },
}

/// Append-only history of versions. Version 0 is the initial one; ids are never reused or invalidated.
/// Ids from another table are rejected even if their index is in range.
#[derive(Debug)]
pub struct VersionTable<T: Snapshot> {
    tag: usize,
    versions: Vec<T>,
}

#[allow(clippy::len_without_is_empty)]
impl<T: Snapshot> VersionTable<T> {
    pub fn new(initial: T) -> Self {
        let tag = NEXT_TABLE.fetch_add(1, Ordering::Relaxed);
        log::debug!("new version table {tag}");
        Self {
            tag,
            versions: vec![initial],
        }
    }
    fn id(&self, index: usize) -> VersionId {
        VersionId {
            table: self.tag,
            index,
        }
    }
    pub fn initial(&self) -> VersionId {
        self.id(0)
    }
    pub fn latest(&self) -> VersionId {
        self.id(self.versions.len() - 1)
    }
    /// Number of versions, always at least 1.
    pub fn len(&self) -> usize {
        self.versions.len()
    }
    /// Panics if `v` was not produced by this table.
    pub fn get(&self, v: VersionId) -> &T {
        match self.try_get(v) {
            Ok(t) => t,
            Err(e) => panic!("{e}"),
        }
    }
    pub fn try_get(&self, v: VersionId) -> Result<&T, VersionError> {
        let unknown = VersionError::Unknown {
            id: v,
            len: self.versions.len(),
        };
        if v.table != self.tag {
            return Err(unknown);
        }
        self.versions.get(v.index).ok_or(unknown)
    }
    /// Appends a version unconditionally.
    pub fn commit(&mut self, value: T) -> VersionId {
        self.versions.push(value);
        let v = self.latest();
        log::debug!("committed {v}");
        v
    }
    /// Builds a version from `base`. If `f` returns `base` itself nothing is appended and `base` is returned.
    pub fn derive(&mut self, base: VersionId, f: impl FnOnce(&T) -> T) -> VersionId {
        let old = self.get(base);
        let new = f(old);
        if new.same_as(old) {
            log::trace!("no-op on {base}, no version created");
            base
        } else {
            self.commit(new)
        }
    }
    /// Makes an old version the latest one again, as a new version.
    pub fn revert(&mut self, v: VersionId) -> VersionId {
        let t = self.get(v).clone();
        self.commit(t)
    }
    pub fn iter(&self) -> impl Iterator<Item = (VersionId, &T)> {
        let table = self.tag;
        self.versions
            .iter()
            .enumerate()
            .map(move |(index, t)| (VersionId { table, index }, t))
    }
}

impl<T: Snapshot> std::ops::Index<VersionId> for VersionTable<T> {
    type Output = T;
    fn index(&self, v: VersionId) -> &T {
        self.get(v)
    }
}
