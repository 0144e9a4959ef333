//! Identity tokens and the cycle guard.
//!
//! A value reached through a reference or a slice element lives at a
//! [`Place`]: the storage cell it sits in plus the index path from that
//! cell's root. Fields and elements of a value at a place inherit a child
//! place. Slices and maps outside any place still have an identity through
//! their own backing storage.

use std::collections::HashSet;

use crate::types::Type;
use crate::value::{StorageId, Value};

/// Location of an addressable value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Place {
    root: StorageId,
    path: Vec<usize>,
}

impl Place {
    pub fn root(storage: StorageId) -> Self {
        Self {
            root: storage,
            path: Vec::new(),
        }
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(index);
        Self {
            root: self.root,
            path,
        }
    }
}

/// Opaque identity of a reference-like value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Identity {
    Place(Place),
    /// A slice window over a backing store.
    Window {
        storage: StorageId,
        start: usize,
        len: usize,
    },
    /// A map table.
    Table(StorageId),
}

/// Identity of `value` located at `place`, if it has one.
pub fn identity_of(value: &Value, place: Option<&Place>) -> Option<Identity> {
    if let Some(place) = place {
        return Some(Identity::Place(place.clone()));
    }
    match value {
        Value::Slice(s) => s.storage().map(|storage| Identity::Window {
            storage,
            start: s.start(),
            len: s.len(),
        }),
        Value::Map(m) => m.storage().map(Identity::Table),
        _ => None,
    }
}

/// Outcome of consulting the [`CycleGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    /// Both sides are the same value.
    Identical,
    /// The pair is already under comparison; assume equal.
    AlreadyVisited,
    /// First encounter; the pair is now recorded.
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Visit {
    low: Identity,
    high: Identity,
    ty: Type,
}

/// Pairs of reference-like values seen during one comparison.
///
/// Entries are never removed, so a pair met again anywhere later in the walk
/// is assumed equal.
#[derive(Debug, Default)]
pub struct CycleGuard {
    visited: HashSet<Visit>,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_short_circuit(&mut self, a: Identity, b: Identity, ty: &Type) -> Shortcut {
        if a == b {
            return Shortcut::Identical;
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let visit = Visit {
            low,
            high,
            ty: ty.clone(),
        };
        if self.visited.contains(&visit) {
            log::trace!("cycle guard hit for {ty}");
            return Shortcut::AlreadyVisited;
        }
        self.visited.insert(visit);
        Shortcut::Fresh
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{SliceValue, Storage};

    fn place() -> Place {
        Place::root(Storage::new(()).id())
    }

    #[test]
    fn identical_pairs_are_not_recorded() {
        let mut guard = CycleGuard::new();
        let p = Identity::Place(place());
        assert_eq!(guard.try_short_circuit(p.clone(), p, &Type::Int), Shortcut::Identical);
        assert!(guard.is_empty());
    }

    #[test]
    fn pairs_are_canonicalized() {
        let mut guard = CycleGuard::new();
        let a = Identity::Place(place());
        let b = Identity::Place(place());
        assert_eq!(guard.try_short_circuit(a.clone(), b.clone(), &Type::Int), Shortcut::Fresh);
        assert_eq!(guard.try_short_circuit(b.clone(), a.clone(), &Type::Int), Shortcut::AlreadyVisited);
        assert_eq!(guard.try_short_circuit(a, b, &Type::Str), Shortcut::Fresh);
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn child_places_are_distinct() {
        let root = place();
        assert_ne!(root.child(0), root);
        assert_ne!(root.child(0), root.child(1));
        assert_eq!(root.child(1).child(2), root.child(1).child(2));
    }

    #[test]
    fn detached_slices_use_their_window() {
        let s = SliceValue::new(Type::Int, vec![1i64.into(), 2i64.into()]).unwrap();
        let whole = identity_of(&s.clone().into(), None);
        let tail = identity_of(&s.subslice(1..2).unwrap().into(), None);
        assert!(whole.is_some());
        assert_ne!(whole, tail);
        assert_eq!(identity_of(&SliceValue::nil(Type::Int).into(), None), None);
        assert_eq!(identity_of(&Value::from(1i64), None), None);
    }
}
