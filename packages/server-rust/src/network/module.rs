//! Network module with deferred startup lifecycle.
//!
//! `new()` allocates shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until shutdown. The dispatch engine is
//! started and seeded before `start()`, so no request can reach an
//! unseeded queue.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    delete_handler, get_handler, health_handler, liveness_handler, put_handler,
    readiness_handler, AppState,
};
use super::middleware::with_http_layers;
use super::shutdown::ShutdownController;
use crate::error::ServerError;
use crate::service::Dispatcher;
use crate::storage::StorageEngine;

/// Manages the HTTP server lifecycle.
///
/// 1. `new()` -- allocates shared state (shutdown controller)
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- accepts connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    dispatcher: Dispatcher,
    storage: Arc<dyn StorageEngine>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        dispatcher: Dispatcher,
        storage: Arc<dyn StorageEngine>,
    ) -> Self {
        Self {
            config,
            listener: None,
            dispatcher,
            storage,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health` -- detailed health JSON
    /// - `GET /health/live` -- liveness probe
    /// - `GET /health/ready` -- readiness probe
    /// - `POST /kv/put`, `POST /kv/get`, `POST /kv/delete` -- `MsgPack` operations
    pub fn build_router(&self) -> Router {
        let state = AppState {
            dispatcher: self.dispatcher.clone(),
            storage: Arc::clone(&self.storage),
            shutdown: Arc::clone(&self.shutdown),
            start_time: Instant::now(),
        };

        let router = Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .route("/kv/put", post(put_handler))
            .route("/kv/get", post(get_handler))
            .route("/kv/delete", post(delete_handler))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .with_state(state);
        with_http_layers(router, &self.config)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which differs from the configured one
    /// when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] if the address cannot be bound.
    pub async fn start(&mut self) -> Result<u16, ServerError> {
        let addr = self.config.bind_addr();
        let transport = |source| ServerError::Transport {
            addr: addr.clone(),
            source,
        };
        let listener = TcpListener::bind(&addr).await.map_err(transport)?;
        let port = listener.local_addr().map_err(transport)?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until `shutdown` resolves, then drains.
    ///
    /// After the signal the health state moves to Draining, new requests
    /// get 503, and admitted requests are given the configured drain timeout
    /// to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] if `start()` was not called or the
    /// server hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = self.config.bind_addr();
        let Some(listener) = self.listener.take() else {
            return Err(ServerError::Transport {
                addr,
                source: std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "start() must be called before serve()",
                ),
            });
        };

        let router = self.build_router();
        let shutdown_ctrl = Arc::clone(&self.shutdown);
        let signal_ctrl = Arc::clone(&self.shutdown);

        shutdown_ctrl.set_ready();
        info!("Serving key-value requests");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                signal_ctrl.trigger_shutdown();
            })
            .await
            .map_err(|source| ServerError::Transport { addr, source })?;

        shutdown_ctrl.trigger_shutdown();
        if shutdown_ctrl.wait_for_drain(self.config.drain_timeout()).await {
            info!("All in-flight requests drained");
        } else {
            warn!("Drain timeout expired with in-flight requests remaining");
        }
        Ok(())
    }
}
