//! [`StorageEngine`] over a configurable [`MapBackend`] strategy.
//!
//! The strategies are single-threaded ordered maps, so the whole map sits
//! behind a reader-writer lock: lookups share it, mutations take it
//! exclusively.

use bytes::Bytes;
use kvstore_core::ordered_map::{MapBackend, OrderedMap, StrategyKind};
use kvstore_core::{ConfigError, MapConfig};
use parking_lot::RwLock;

use crate::storage::engine::StorageEngine;

/// Ordered storage with a strategy chosen once from configuration.
#[derive(Debug)]
pub struct OrderedMapStorage {
    map: RwLock<MapBackend<Bytes, Bytes>>,
}

impl OrderedMapStorage {
    /// Builds the storage with the strategy named by `config`.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigError`] from strategy selection.
    pub fn new(config: &MapConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            map: RwLock::new(MapBackend::from_config(config)?),
        })
    }

    /// Strategy backing this storage.
    #[must_use]
    pub fn strategy(&self) -> StrategyKind {
        self.map.read().kind()
    }
}

impl StorageEngine for OrderedMapStorage {
    /// Find-then-replace: the strategies never overwrite on insert, so an
    /// existing entry is removed first. Both steps happen under one write
    /// guard.
    fn upsert(&self, key: Bytes, value: Bytes) -> Option<Bytes> {
        let mut map = self.map.write();
        let previous = map.get(&key[..]).cloned();
        if previous.is_some() {
            map.remove(&key[..]);
        }
        map.insert(key, value);
        previous
    }

    fn lookup(&self, key: &[u8]) -> Option<Bytes> {
        self.map.read().get(key).cloned()
    }

    fn remove(&self, key: &[u8]) -> bool {
        self.map.write().remove(key)
    }

    fn len(&self) -> usize {
        self.map.read().len()
    }

    fn clear(&self) {
        self.map.write().clear();
    }

    fn name(&self) -> &'static str {
        "ordered_map"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    fn scan_from(storage: &OrderedMapStorage, from: &[u8], limit: usize) -> Vec<Bytes> {
        storage
            .map
            .read()
            .lower_bound(from)
            .take(limit)
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn storages() -> Vec<OrderedMapStorage> {
        [StrategyKind::BTree, StrategyKind::Flat]
            .into_iter()
            .map(|kind| OrderedMapStorage::new(&MapConfig::for_kind(kind)).unwrap())
            .collect()
    }

    #[test]
    fn upsert_replaces_existing_value() {
        for storage in storages() {
            assert!(storage.upsert(b("k"), b("v1")).is_none());
            assert_eq!(storage.upsert(b("k"), b("v2")), Some(b("v1")));
            assert_eq!(storage.lookup(b"k"), Some(b("v2")));
            assert_eq!(storage.len(), 1, "{}", storage.strategy());
        }
    }

    #[test]
    fn remove_is_idempotent() {
        for storage in storages() {
            storage.upsert(b("k"), b("v"));
            assert!(storage.remove(b"k"));
            assert!(!storage.remove(b"k"));
            assert!(storage.is_empty());
        }
    }

    #[test]
    fn empty_key_and_value() {
        for storage in storages() {
            storage.upsert(Bytes::new(), Bytes::new());
            assert_eq!(storage.lookup(b""), Some(Bytes::new()));
            assert!(storage.remove(b""));
        }
    }

    #[test]
    fn scan_is_ordered_from_lower_bound() {
        for storage in storages() {
            for k in ["key3", "key1", "key4", "key2"] {
                storage.upsert(b(k), b(k));
            }
            assert_eq!(scan_from(&storage, b"key2", 2), vec![b("key2"), b("key3")]);
        }
    }

    #[test]
    fn strategy_follows_config() {
        let config = MapConfig::from_json(r#"{"map_type": "flat_map"}"#).unwrap();
        let storage = OrderedMapStorage::new(&config).unwrap();
        assert_eq!(storage.strategy(), StrategyKind::Flat);
        assert_eq!(storage.name(), "ordered_map");
    }
}
