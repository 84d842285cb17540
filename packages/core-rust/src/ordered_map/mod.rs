//! Interchangeable ordered-map strategies behind one capability trait.
//!
//! - [`BTreeStrategy`]: balanced tree, `O(log n)` inserts and removals.
//! - [`FlatStrategy`]: sorted contiguous vector with a preallocation hint
//!   and a load factor, trading `O(n)` inserts for cache-friendly lookups
//!   and scans.
//!
//! [`MapBackend`] is the closed set of strategies, selected once from a
//! [`MapConfig`] document. Every strategy yields identical observable
//! results for the same sequence of operations.

pub mod btree;
pub mod factory;
pub mod flat;

use std::borrow::Borrow;

pub use btree::BTreeStrategy;
pub use factory::{BackendIter, BTreeOptions, FlatOptions, MapBackend, MapConfig, MapOptions, StrategyKind};
pub use flat::{FlatIter, FlatStrategy};

/// Ordered key-value map capability set.
///
/// `insert` never overwrites: callers wanting replace semantics remove the
/// old entry first. Bound queries return an iterator positioned at the
/// first matching entry; an iterator that yields nothing is the end marker.
pub trait OrderedMap<K: Ord, V> {
    /// Ascending iterator over entries.
    type Iter<'a>: Iterator<Item = (&'a K, &'a V)>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    /// Inserts `key` if absent. Returns `false` when the key already exists.
    fn insert(&mut self, key: K, value: V) -> bool;

    /// Removes `key`. Returns whether it was present.
    fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized;

    fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized;

    fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    /// Iterates from the smallest key.
    fn iter(&self) -> Self::Iter<'_>;

    /// Iterates from the first key `>= key`.
    fn lower_bound<Q>(&self, key: &Q) -> Self::Iter<'_>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized;

    /// Iterates from the first key `> key`.
    fn upper_bound<Q>(&self, key: &Q) -> Self::Iter<'_>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized;
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;

    use super::*;

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u8, u16),
        Remove(u8),
        Clear,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            8 => (any::<u8>(), any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
            4 => any::<u8>().prop_map(Op::Remove),
            1 => Just(Op::Clear),
        ]
    }

    fn apply<M: OrderedMap<u8, u16>>(map: &mut M, op: &Op) -> Option<bool> {
        match *op {
            Op::Insert(k, v) => Some(map.insert(k, v)),
            Op::Remove(k) => Some(map.remove(&k)),
            Op::Clear => {
                map.clear();
                None
            }
        }
    }

    fn snapshot<M: OrderedMap<u8, u16>>(map: &M) -> Vec<(u8, u16)> {
        map.iter().map(|(k, v)| (*k, *v)).collect()
    }

    proptest! {
        /// Both strategies agree with a plain `BTreeMap` model on every
        /// operation result, on the final contents, and on bound queries.
        #[test]
        fn strategies_match_model(ops in prop::collection::vec(op_strategy(), 0..200), probe in any::<u8>()) {
            let mut model: BTreeMap<u8, u16> = BTreeMap::new();
            let mut tree = BTreeStrategy::new(16);
            let mut flat = FlatStrategy::new(4, 0.5).unwrap();

            for op in &ops {
                let expected = match *op {
                    Op::Insert(k, v) => {
                        let absent = !model.contains_key(&k);
                        model.entry(k).or_insert(v);
                        Some(absent)
                    }
                    Op::Remove(k) => Some(model.remove(&k).is_some()),
                    Op::Clear => {
                        model.clear();
                        None
                    }
                };
                prop_assert_eq!(apply(&mut tree, op), expected);
                prop_assert_eq!(apply(&mut flat, op), expected);
            }

            let want: Vec<(u8, u16)> = model.iter().map(|(k, v)| (*k, *v)).collect();
            prop_assert_eq!(snapshot(&tree), want.clone());
            prop_assert_eq!(snapshot(&flat), want);
            prop_assert_eq!(tree.len(), model.len());
            prop_assert_eq!(flat.len(), model.len());

            let lower = model.range(probe..).next().map(|(k, v)| (*k, *v));
            prop_assert_eq!(tree.lower_bound(&probe).next().map(|(k, v)| (*k, *v)), lower);
            prop_assert_eq!(flat.lower_bound(&probe).next().map(|(k, v)| (*k, *v)), lower);

            let upper = model
                .range((std::ops::Bound::Excluded(probe), std::ops::Bound::Unbounded))
                .next()
                .map(|(k, v)| (*k, *v));
            prop_assert_eq!(tree.upper_bound(&probe).next().map(|(k, v)| (*k, *v)), upper);
            prop_assert_eq!(flat.upper_bound(&probe).next().map(|(k, v)| (*k, *v)), upper);

            prop_assert_eq!(tree.get(&probe), model.get(&probe));
            prop_assert_eq!(flat.get(&probe), model.get(&probe));
        }
    }
}
