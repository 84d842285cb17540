//! Concrete [`StorageEngine`](super::StorageEngine) implementations.

pub mod ordered;
pub mod skiplist;

pub use ordered::OrderedMapStorage;
pub use skiplist::SkipListStorage;
