//! Whole-server configuration document.
//!
//! ```json
//! {
//!   "network": { "host": "0.0.0.0", "port": 50051 },
//!   "service": { "queue_count": 4, "threads_per_queue": 2 },
//!   "storage": { "engine": "ordered_map", "backend": { "map_type": "flat_map" } },
//!   "metrics_addr": "0.0.0.0:9100"
//! }
//! ```
//!
//! Every section is optional and falls back to its defaults.

use std::net::SocketAddr;
use std::path::Path;

use kvstore_core::ConfigError;
use serde::{Deserialize, Serialize};

use crate::network::NetworkConfig;
use crate::service::ServiceConfig;
use crate::storage::{EngineKind, StorageConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub network: NetworkConfig,
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    /// Prometheus scrape address. Metrics are not exported when unset.
    pub metrics_addr: Option<String>,
}

impl ServerConfig {
    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] for malformed JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Checks everything that can be checked without building anything.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        let engine: EngineKind = self.storage.engine.parse()?;
        if engine == EngineKind::OrderedMap {
            self.storage.backend.kind()?;
        }
        self.metrics_socket_addr()?;
        Ok(())
    }

    /// Parsed `metrics_addr`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] if it is not a socket address.
    pub fn metrics_socket_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        self.metrics_addr
            .as_deref()
            .map(|addr| {
                addr.parse().map_err(|e| ConfigError::InvalidOption {
                    option: "metrics_addr",
                    reason: format!("{addr}: {e}"),
                })
            })
            .transpose()
    }
}
