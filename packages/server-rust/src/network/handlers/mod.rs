//! Axum handlers and the state they share.

pub mod health;
pub mod kv;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use kv::{delete_handler, get_handler, put_handler};

use std::sync::Arc;
use std::time::Instant;

use super::ShutdownController;
use crate::service::Dispatcher;
use crate::storage::StorageEngine;

/// State handed to every handler through `State`.
#[derive(Clone)]
pub struct AppState {
    /// Submission handle into the dispatch engine.
    pub dispatcher: Dispatcher,
    /// The store, read directly only for health reporting.
    pub storage: Arc<dyn StorageEngine>,
    /// Admission control for key-value requests.
    pub shutdown: Arc<ShutdownController>,
    pub start_time: Instant,
}
