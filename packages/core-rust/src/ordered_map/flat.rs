//! Sorted-vector strategy tuned by a preallocation size and a load factor.

use std::borrow::Borrow;
use std::slice;

use super::OrderedMap;
use crate::error::ConfigError;

/// Ordered map stored as a sorted `Vec` of entries.
///
/// Lookups are binary searches over contiguous memory; inserts and removals
/// shift the tail. Capacity is managed from two hints:
///
/// - `initial_size`: entries preallocated up front, and the floor below
///   which capacity is never shrunk.
/// - `load_factor`: maximum occupancy (`len / capacity`) tolerated before
///   growing. Capacity is released again when occupancy drops below a
///   quarter of the load factor.
#[derive(Debug, Clone)]
pub struct FlatStrategy<K, V> {
    entries: Vec<(K, V)>,
    initial_size: usize,
    load_factor: f32,
}

impl<K: Ord, V> FlatStrategy<K, V> {
    /// Creates an empty map with `initial_size` entries preallocated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] unless `0 < load_factor <= 1`.
    pub fn new(initial_size: usize, load_factor: f32) -> Result<Self, ConfigError> {
        if load_factor.is_nan() || load_factor <= 0.0 || load_factor > 1.0 {
            return Err(ConfigError::InvalidOption {
                option: "load_factor",
                reason: format!("{load_factor} is outside (0, 1]"),
            });
        }
        Ok(Self {
            entries: Vec::with_capacity(initial_size),
            initial_size,
            load_factor,
        })
    }

    /// Configured maximum occupancy.
    #[must_use]
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Currently allocated entry slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    fn search<Q>(&self, key: &Q) -> Result<usize, usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.binary_search_by(|(k, _)| k.borrow().cmp(key))
    }

    /// Capacity needed to hold `len` entries at the configured occupancy.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn target_capacity(&self, len: usize) -> usize {
        (len as f64 / f64::from(self.load_factor)).ceil() as usize
    }

    fn grow_for(&mut self, len: usize) {
        let target = self.target_capacity(len);
        if target > self.entries.capacity() {
            self.entries.reserve(target - self.entries.len());
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn maybe_shrink(&mut self) {
        let capacity = self.entries.capacity();
        if capacity <= self.initial_size {
            return;
        }
        let occupancy = self.entries.len() as f64 / capacity as f64;
        if occupancy < f64::from(self.load_factor) / 4.0 {
            let target = self.target_capacity(self.entries.len()).max(self.initial_size);
            self.entries.shrink_to(target);
        }
    }

    fn iter_from(&self, start: usize) -> FlatIter<'_, K, V> {
        FlatIter {
            inner: self.entries[start..].iter(),
        }
    }
}

impl<K: Ord, V> OrderedMap<K, V> for FlatStrategy<K, V> {
    type Iter<'a>
        = FlatIter<'a, K, V>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn insert(&mut self, key: K, value: V) -> bool {
        match self.search(&key) {
            Ok(_) => false,
            Err(at) => {
                self.grow_for(self.entries.len() + 1);
                self.entries.insert(at, (key, value));
                true
            }
        }
    }

    fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.search(key) {
            Ok(at) => {
                self.entries.remove(at);
                self.maybe_shrink();
                true
            }
            Err(_) => false,
        }
    }

    fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.search(key).ok().map(|at| &self.entries[at].1)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.entries.shrink_to(self.initial_size);
    }

    fn iter(&self) -> Self::Iter<'_> {
        self.iter_from(0)
    }

    fn lower_bound<Q>(&self, key: &Q) -> Self::Iter<'_>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let start = self.entries.partition_point(|(k, _)| k.borrow() < key);
        self.iter_from(start)
    }

    fn upper_bound<Q>(&self, key: &Q) -> Self::Iter<'_>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let start = self.entries.partition_point(|(k, _)| k.borrow() <= key);
        self.iter_from(start)
    }
}

/// Ascending iterator over a [`FlatStrategy`].
#[derive(Debug, Clone)]
pub struct FlatIter<'a, K, V> {
    inner: slice::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for FlatIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for FlatIter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (k, v))
    }
}

impl<K, V> ExactSizeIterator for FlatIter<'_, K, V> {}
