//! Factory for the process-wide [`StorageEngine`].
//!
//! [`create_storage`] is the one place the engine is chosen. The result is
//! built once at startup and handed to the dispatch engine and the HTTP
//! state by `Arc`; nothing reaches it through globals.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use kvstore_core::{ConfigError, MapConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::storage::engine::StorageEngine;
use crate::storage::engines::{OrderedMapStorage, SkipListStorage};

/// Known storage engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Concurrent skip list. The default.
    SkipList,
    /// Configurable ordered-map strategy behind a reader-writer lock.
    OrderedMap,
}

impl EngineKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SkipList => "skiplist",
            Self::OrderedMap => "ordered_map",
        }
    }
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "skiplist" => Ok(Self::SkipList),
            "ordered_map" => Ok(Self::OrderedMap),
            other => Err(ConfigError::UnknownEngine {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage section of the server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Engine name: `"skiplist"` or `"ordered_map"`.
    pub engine: String,
    /// Strategy document, consulted only by the `ordered_map` engine.
    pub backend: MapConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::SkipList.as_str().to_string(),
            backend: MapConfig::default(),
        }
    }
}

/// Builds the engine named by `config`.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownEngine`] for an unrecognised engine name,
/// and any strategy error raised while building the `ordered_map` backend.
pub fn create_storage(config: &StorageConfig) -> Result<Arc<dyn StorageEngine>, ConfigError> {
    let kind: EngineKind = config.engine.parse()?;
    let storage: Arc<dyn StorageEngine> = match kind {
        EngineKind::SkipList => Arc::new(SkipListStorage::new()),
        EngineKind::OrderedMap => {
            let storage = OrderedMapStorage::new(&config.backend)?;
            info!(strategy = %storage.strategy(), "ordered map backend configured");
            Arc::new(storage)
        }
    };
    info!(engine = %kind, "storage engine created");
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn default_is_skiplist() {
        let storage = create_storage(&StorageConfig::default()).unwrap();
        assert_eq!(storage.name(), "skiplist");
    }

    #[test]
    fn ordered_map_engine_uses_backend_document() {
        let config: StorageConfig = serde_json::from_str(
            r#"{"engine": "ordered_map", "backend": {"map_type": "flat_map", "map_options": {"flat_map": {"initial_size": 10}}}}"#,
        )
        .unwrap();
        let storage = create_storage(&config).unwrap();
        assert_eq!(storage.name(), "ordered_map");

        storage.upsert(Bytes::from_static(b"k"), Bytes::from_static(b"v"));
        assert_eq!(storage.lookup(b"k"), Some(Bytes::from_static(b"v")));
    }

    #[test]
    fn unknown_engine_is_a_config_error() {
        let config = StorageConfig {
            engine: "lsm".to_string(),
            ..StorageConfig::default()
        };
        let err = create_storage(&config).err().unwrap();
        assert!(matches!(err, ConfigError::UnknownEngine { ref name } if name == "lsm"));
    }

    #[test]
    fn unknown_strategy_surfaces_through_engine() {
        let config = StorageConfig {
            engine: "ordered_map".to_string(),
            backend: MapConfig {
                map_type: "skip_map".to_string(),
                ..MapConfig::default()
            },
        };
        assert!(matches!(
            create_storage(&config),
            Err(ConfigError::UnknownStrategy { .. })
        ));
    }

    #[test]
    fn backend_ignored_for_skiplist() {
        let config = StorageConfig {
            engine: "skiplist".to_string(),
            backend: MapConfig {
                map_type: "not_checked".to_string(),
                ..MapConfig::default()
            },
        };
        assert!(create_storage(&config).is_ok());
    }
}
