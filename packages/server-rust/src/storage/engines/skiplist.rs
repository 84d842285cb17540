//! Default [`StorageEngine`] backed by the concurrent [`SkipList`].
//!
//! Readers never block; writers only lock the nodes adjacent to the key
//! they touch, so unrelated keys do not contend.

use bytes::Bytes;
use kvstore_core::SkipList;

use crate::storage::engine::StorageEngine;

/// Lock-minimal ordered storage.
#[derive(Debug, Default)]
pub struct SkipListStorage {
    list: SkipList,
}

impl SkipListStorage {
    /// Creates a new, empty `SkipListStorage`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            list: SkipList::new(),
        }
    }

    /// Borrows the underlying list for ordered traversal.
    #[must_use]
    pub fn list(&self) -> &SkipList {
        &self.list
    }
}

impl StorageEngine for SkipListStorage {
    fn upsert(&self, key: Bytes, value: Bytes) -> Option<Bytes> {
        self.list.upsert(key, value)
    }

    fn lookup(&self, key: &[u8]) -> Option<Bytes> {
        self.list.lookup(key)
    }

    fn remove(&self, key: &[u8]) -> bool {
        self.list.remove(key)
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    fn clear(&self) {
        self.list.clear();
    }

    fn name(&self) -> &'static str {
        "skiplist"
    }
}
