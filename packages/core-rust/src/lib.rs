//! Key-value store core: the concurrent skip list, ordered-map strategies,
//! and the wire types shared by server and clients.

pub mod error;
pub mod messages;
pub mod ordered_map;
pub mod skiplist;

pub use error::ConfigError;
pub use messages::{
    DeleteRequest, DeleteResponse, GetRequest, GetResponse, PutRequest, PutResponse,
};
pub use ordered_map::{MapBackend, MapConfig, OrderedMap, StrategyKind};
pub use skiplist::{Accessor, SkipList};
