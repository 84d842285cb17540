//! Startup-fatal server errors.

use kvstore_core::ConfigError;

/// Errors that abort server startup before any traffic is served.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The configuration was rejected (unknown engine or strategy, bad option).
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The listener could not be bound or inspected.
    #[error("cannot listen on {addr}: {source}")]
    Transport {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread {name}: {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
