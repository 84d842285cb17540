//! Health, liveness, and readiness endpoint handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::network::HealthState;

/// Returns detailed health information as JSON.
///
/// Always returns 200; the `state` field tells whether the server is
/// actually serving.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let health = state.shutdown.health_state();

    Json(json!({
        "state": health.as_str(),
        "engine": state.storage.name(),
        "keys": state.storage.len(),
        "queues": state.dispatcher.queue_count(),
        "in_flight": state.shutdown.in_flight_count(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Liveness probe: 200 whenever the process can answer at all.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe: 200 when ready, 503 while starting, draining or stopped.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.health_state() == HealthState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use bytes::Bytes;

    use super::*;
    use crate::network::ShutdownController;
    use crate::service::{DispatchEngine, ServiceConfig};
    use crate::storage::SkipListStorage;

    /// State over a small live engine. Keep the engine alive for the test.
    pub(crate) fn test_state() -> (AppState, DispatchEngine) {
        let storage: Arc<dyn crate::storage::StorageEngine> = Arc::new(SkipListStorage::new());
        let config = ServiceConfig {
            queue_count: 2,
            threads_per_queue: 1,
        };
        let engine = DispatchEngine::start(config, Arc::clone(&storage)).unwrap();
        let state = AppState {
            dispatcher: engine.dispatcher(),
            storage,
            shutdown: Arc::new(ShutdownController::new()),
            start_time: Instant::now(),
        };
        (state, engine)
    }

    #[tokio::test]
    async fn health_handler_returns_json_with_all_fields() {
        let (state, _engine) = test_state();
        state.shutdown.set_ready();
        state
            .storage
            .upsert(Bytes::from_static(b"k"), Bytes::from_static(b"v"));

        let json = health_handler(State(state)).await.0;
        assert_eq!(json["state"], "ready");
        assert_eq!(json["engine"], "skiplist");
        assert_eq!(json["keys"], 1);
        assert_eq!(json["queues"], 2);
        assert_eq!(json["in_flight"], 0);
        assert!(json["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn health_handler_reports_draining_state() {
        let (state, _engine) = test_state();
        state.shutdown.set_ready();
        state.shutdown.trigger_shutdown();

        let json = health_handler(State(state)).await.0;
        assert_eq!(json["state"], "draining");
    }

    #[tokio::test]
    async fn liveness_handler_always_returns_200() {
        assert_eq!(liveness_handler().await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_follows_health_state() {
        let (state, _engine) = test_state();
        assert_eq!(
            readiness_handler(State(state.clone())).await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.shutdown.set_ready();
        assert_eq!(readiness_handler(State(state.clone())).await, StatusCode::OK);

        state.shutdown.trigger_shutdown();
        assert_eq!(
            readiness_handler(State(state)).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
