use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::{Add, RangeBounds};

use derivative::Derivative;

pub trait AggregatedData: Debug + Clone + Default {
    type Data: Debug + Clone;
    /// Create aggregated data from a single data item
    fn from(data: &Self::Data) -> Self;
    /// Merge two aggregated data items. The other item contains data of some (not necessarily all) items to the right.
    fn merge(self, right: Self) -> Self;
}

impl AggregatedData for () {
    type Data = ();
    fn from(_: &Self::Data) -> Self {}
    fn merge(self, _: Self) -> Self {}
}

/// Sum of all values in a range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sum<T>(pub T);

impl<T> AggregatedData for Sum<T>
where
    T: Add<Output = T> + Debug + Clone + Default,
{
    type Data = T;
    fn from(data: &T) -> Self {
        Self(data.clone())
    }
    fn merge(self, right: Self) -> Self {
        Self(self.0 + right.0)
    }
}

/// Minimum value in a range, `None` for an empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Derivative)]
#[derivative(Default(bound = ""))]
pub struct Min<T>(pub Option<T>);

impl<T: Ord + Debug + Clone> AggregatedData for Min<T> {
    type Data = T;
    fn from(data: &T) -> Self {
        Self(Some(data.clone()))
    }
    fn merge(self, right: Self) -> Self {
        match (self.0, right.0) {
            (Some(a), Some(b)) => Self(Some(a.min(b))),
            (a, b) => Self(a.or(b)),
        }
    }
}

/// Maximum value in a range, `None` for an empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Derivative)]
#[derivative(Default(bound = ""))]
pub struct Max<T>(pub Option<T>);

impl<T: Ord + Debug + Clone> AggregatedData for Max<T> {
    type Data = T;
    fn from(data: &T) -> Self {
        Self(Some(data.clone()))
    }
    fn merge(self, right: Self) -> Self {
        match (self.0, right.0) {
            (Some(a), Some(b)) => Self(Some(a.max(b))),
            (a, b) => Self(a.or(b)),
        }
    }
}

/// Number of items in a range. Values are ignored.
#[derive(Derivative)]
#[derivative(
    Debug(bound = ""),
    Clone(bound = ""),
    Copy(bound = ""),
    Default(bound = ""),
    PartialEq(bound = ""),
    Eq(bound = "")
)]
pub struct Count<T>(pub usize, #[derivative(Debug = "ignore")] PhantomData<T>);

impl<T> Count<T> {
    pub fn new(count: usize) -> Self {
        Self(count, PhantomData)
    }
}

impl<T: Debug + Clone> AggregatedData for Count<T> {
    type Data = T;
    fn from(_: &T) -> Self {
        Self::new(1)
    }
    fn merge(self, right: Self) -> Self {
        Self::new(self.0 + right.0)
    }
}

/// Carries values of type `T` without aggregating them. Turns a segment tree into a persistent array.
#[derive(Derivative)]
#[derivative(Debug(bound = ""), Clone(bound = ""), Default(bound = ""))]
pub struct Opaque<T>(PhantomData<T>);

impl<T: Debug + Clone> AggregatedData for Opaque<T> {
    type Data = T;
    fn from(_: &T) -> Self {
        Self(PhantomData)
    }
    fn merge(self, _: Self) -> Self {
        self
    }
}

/// Converts a range of positions into a half open `[l, r)` pair.
pub(crate) fn range_to_lr(range: impl RangeBounds<usize>, len: impl FnOnce() -> usize) -> [usize; 2] {
    use std::ops::Bound::*;
    let start = match range.start_bound() {
        Included(start) => *start,
        Excluded(start) => start.saturating_add(1),
        Unbounded => 0,
    };
    let end = match range.end_bound() {
        Included(end) => end.saturating_add(1),
        Excluded(end) => *end,
        Unbounded => len(),
    };
    [start, end]
}
