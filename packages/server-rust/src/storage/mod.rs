//! Storage layer: the [`StorageEngine`] trait, its implementations, and the
//! factory that picks one from configuration.
//!
//! - [`SkipListStorage`]: concurrent skip list, fine-grained node locks
//! - [`OrderedMapStorage`]: a [`MapBackend`](kvstore_core::MapBackend)
//!   strategy behind a reader-writer lock

pub mod engine;
pub mod engines;
pub mod factory;

pub use engine::StorageEngine;
pub use engines::{OrderedMapStorage, SkipListStorage};
pub use factory::{create_storage, EngineKind, StorageConfig};
