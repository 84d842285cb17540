//! Balanced-tree strategy backed by [`BTreeMap`].

use std::borrow::Borrow;
use std::collections::btree_map::{self, BTreeMap};
use std::ops::Bound;

use super::OrderedMap;

/// Ordered map strategy backed by the standard B-tree.
///
/// The tree allocates per node, so the initial-size hint is accepted for
/// configuration symmetry and otherwise unused.
#[derive(Debug, Clone)]
pub struct BTreeStrategy<K, V> {
    map: BTreeMap<K, V>,
}

impl<K: Ord, V> BTreeStrategy<K, V> {
    #[must_use]
    pub fn new(_initial_size: usize) -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> Default for BTreeStrategy<K, V> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<K: Ord, V> OrderedMap<K, V> for BTreeStrategy<K, V> {
    type Iter<'a>
        = btree_map::Range<'a, K, V>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn insert(&mut self, key: K, value: V) -> bool {
        match self.map.entry(key) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.remove(key).is_some()
    }

    fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.get(key)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn clear(&mut self) {
        self.map.clear();
    }

    fn iter(&self) -> Self::Iter<'_> {
        self.map.range::<K, _>(..)
    }

    fn lower_bound<Q>(&self, key: &Q) -> Self::Iter<'_>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map
            .range::<Q, _>((Bound::Included(key), Bound::Unbounded))
    }

    fn upper_bound<Q>(&self, key: &Q) -> Self::Iter<'_>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map
            .range::<Q, _>((Bound::Excluded(key), Bound::Unbounded))
    }
}
