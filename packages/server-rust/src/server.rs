//! Composition root wiring storage, dispatch engine and network module.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::network::{NetworkModule, ShutdownController};
use crate::service::DispatchEngine;
use crate::storage::{create_storage, StorageEngine};

/// A bound, not yet serving, key-value server.
///
/// Startup order: storage, then the dispatch engine (which seeds every
/// queue slot), then the listener. Shutdown runs in reverse: the listener
/// drains, then the engine stops and joins its workers.
pub struct KvServer {
    engine: DispatchEngine,
    network: NetworkModule,
    storage: Arc<dyn StorageEngine>,
    port: u16,
}

impl KvServer {
    /// Builds every component and binds the listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Configuration`] for a rejected configuration,
    /// [`ServerError::WorkerSpawn`] if workers cannot start and
    /// [`ServerError::Transport`] if the address cannot be bound.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let storage = create_storage(&config.storage)?;
        let engine = DispatchEngine::start(config.service, Arc::clone(&storage))?;
        let mut network =
            NetworkModule::new(config.network.clone(), engine.dispatcher(), Arc::clone(&storage));
        let port = network.start().await?;
        Ok(Self {
            engine,
            network,
            storage,
            port,
        })
    }

    /// Port the listener is bound to.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn storage(&self) -> Arc<dyn StorageEngine> {
        Arc::clone(&self.storage)
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        self.network.shutdown_controller()
    }

    /// Serves until `shutdown` resolves, then drains and stops the engine.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] on a fatal listener error. The
    /// engine is stopped in either case.
    pub async fn run(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let Self {
            mut engine,
            network,
            ..
        } = self;

        let served = network.serve(shutdown).await;

        // Joining worker threads blocks, so keep it off the async workers.
        if tokio::task::spawn_blocking(move || engine.shutdown()).await.is_err() {
            warn!("dispatch engine shutdown panicked");
        }
        info!("server stopped");
        served
    }
}
