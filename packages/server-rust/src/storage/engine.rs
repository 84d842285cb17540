//! Storage engine trait shared by every backend.
//!
//! Defines [`StorageEngine`], the single store the dispatch engine executes
//! operations against. Implementations provide their own internal
//! synchronization; callers never take an external lock.

use bytes::Bytes;

/// Concurrent byte-keyed store.
///
/// All operations are synchronous and run inline on the calling worker
/// thread. Wrapped in `Arc<dyn StorageEngine>` and shared by every worker.
pub trait StorageEngine: Send + Sync + 'static {
    /// Inserts `key` or replaces its value. Returns the previous value if any.
    fn upsert(&self, key: Bytes, value: Bytes) -> Option<Bytes>;

    /// Retrieves the value stored under `key`.
    fn lookup(&self, key: &[u8]) -> Option<Bytes>;

    /// Removes `key`, returning whether it was present.
    fn remove(&self, key: &[u8]) -> bool;

    /// Returns the number of entries.
    fn len(&self) -> usize;

    /// Checks if the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all entries. Takes `&self` for `Arc<dyn StorageEngine>` compatibility.
    fn clear(&self);

    /// Engine name as used in configuration, for logs and health output.
    fn name(&self) -> &'static str;
}
