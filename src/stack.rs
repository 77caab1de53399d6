use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use derivative::Derivative;

use crate::versions::Snapshot;

struct StackNode<T> {
    value: T,
    next: Option<Rc<StackNode<T>>>,
}

/// Persistent stack. Push and pop are O(1) and every version shares its tail with the one it came from.
#[derive(Derivative)]
#[derivative(Clone(bound = ""), Default(bound = ""))]
pub struct PersistentStack<T> {
    head: Option<Rc<StackNode<T>>>,
    len: usize,
}

impl<T: Debug> Debug for PersistentStack<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> PersistentStack<T> {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&self, value: T) -> Self {
        Self {
            head: Some(Rc::new(StackNode {
                value,
                next: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }
    /// Top value and the version below it. None if empty.
    pub fn pop(&self) -> Option<(&T, Self)> {
        let head = self.head.as_ref()?;
        let rest = Self {
            head: head.next.clone(),
            len: self.len - 1,
        };
        Some((&head.value, rest))
    }
    pub fn peek(&self) -> Option<&T> {
        self.head.as_ref().map(|n| &n.value)
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
    /// Values from top to bottom.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let mut cur = self.head.as_deref();
        std::iter::from_fn(move || {
            let n = cur?;
            cur = n.next.as_deref();
            Some(&n.value)
        })
    }
}

impl<T> Snapshot for PersistentStack<T> {
    fn same_as(&self, other: &Self) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> FromIterator<T> for PersistentStack<T> {
    /// The last item ends up on top.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), |s, v| s.push(v))
    }
}
