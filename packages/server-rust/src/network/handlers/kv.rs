//! Key-value endpoints: `POST /kv/put`, `POST /kv/get`, `POST /kv/delete`.
//!
//! Bodies are named `MsgPack` maps in both directions. Status codes:
//!
//! - 200: the operation ran; "not found" is reported in the body
//! - 400: the request body could not be decoded
//! - 500: the store faulted; the body still carries the populated response
//! - 503: the server is not ready or is shutting down

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use kvstore_core::messages::CONTENT_TYPE;
use kvstore_core::{
    DeleteRequest, DeleteResponse, GetRequest, GetResponse, PutRequest, PutResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use super::AppState;
use crate::service::{Operation, OperationError, OperationResponse};

pub async fn put_handler(State(state): State<AppState>, body: Bytes) -> Response {
    dispatch::<PutRequest, PutResponse>(&state, &body, Operation::Put, |response| {
        match response {
            OperationResponse::Put(r) => Some(r),
            _ => None,
        }
    })
    .await
}

pub async fn get_handler(State(state): State<AppState>, body: Bytes) -> Response {
    dispatch::<GetRequest, GetResponse>(&state, &body, Operation::Get, |response| {
        match response {
            OperationResponse::Get(r) => Some(r),
            _ => None,
        }
    })
    .await
}

pub async fn delete_handler(State(state): State<AppState>, body: Bytes) -> Response {
    dispatch::<DeleteRequest, DeleteResponse>(&state, &body, Operation::Delete, |response| {
        match response {
            OperationResponse::Delete(r) => Some(r),
            _ => None,
        }
    })
    .await
}

/// Decodes `body`, submits it, and encodes the typed response.
async fn dispatch<Req, Resp>(
    state: &AppState,
    body: &[u8],
    wrap: fn(Req) -> Operation,
    unwrap: fn(OperationResponse) -> Option<Resp>,
) -> Response
where
    Req: DeserializeOwned,
    Resp: Serialize,
{
    let Some(_guard) = state.shutdown.admit() else {
        return unavailable();
    };

    let request: Req = match rmp_serde::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "rejecting undecodable request body");
            return (StatusCode::BAD_REQUEST, format!("invalid request body: {e}")).into_response();
        }
    };

    match state.dispatcher.submit(wrap(request)).await {
        Ok(response) => {
            let status = if response.is_fault() {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::OK
            };
            let kind = response.kind();
            match unwrap(response) {
                Some(body) => msgpack(status, &body),
                None => {
                    error!(kind = %kind, "response kind does not match request");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        Err(OperationError::ShuttingDown) => unavailable(),
        Err(e @ OperationError::Dropped) => {
            error!(error = %e, "operation lost");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn msgpack<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match rmp_serde::to_vec_named(body) {
        Ok(bytes) => (status, [(header::CONTENT_TYPE, CONTENT_TYPE)], bytes).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, OperationError::ShuttingDown.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;
    use crate::network::handlers::health::tests::test_state;

    fn encode<T: Serialize>(value: &T) -> Bytes {
        Bytes::from(rmp_serde::to_vec_named(value).unwrap())
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> T {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        rmp_serde::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let (state, _engine) = test_state();
        state.shutdown.set_ready();

        let put = PutRequest {
            key: b"key1".to_vec(),
            value: b"value1".to_vec(),
        };
        let response = put_handler(State(state.clone()), encode(&put)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/msgpack"
        );
        assert_eq!(decode::<PutResponse>(response).await, PutResponse::ok());

        let get = GetRequest { key: b"key1".to_vec() };
        let response = get_handler(State(state.clone()), encode(&get)).await;
        assert_eq!(
            decode::<GetResponse>(response).await,
            GetResponse::found(b"value1".to_vec())
        );

        let delete = DeleteRequest { key: b"key1".to_vec() };
        let response = delete_handler(State(state.clone()), encode(&delete)).await;
        assert!(decode::<DeleteResponse>(response).await.success);

        let response = delete_handler(State(state.clone()), encode(&delete)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!decode::<DeleteResponse>(response).await.success);

        let response = get_handler(State(state), encode(&get)).await;
        assert!(!decode::<GetResponse>(response).await.found);
    }

    #[tokio::test]
    async fn undecodable_body_is_bad_request() {
        let (state, _engine) = test_state();
        state.shutdown.set_ready();

        let response = put_handler(State(state), Bytes::from_static(b"\xc1not msgpack")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn not_ready_is_unavailable() {
        let (state, _engine) = test_state();
        let get = GetRequest { key: b"k".to_vec() };

        let response = get_handler(State(state.clone()), encode(&get)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.shutdown.set_ready();
        state.shutdown.trigger_shutdown();
        let response = get_handler(State(state), encode(&get)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stopped_engine_is_unavailable() {
        let (state, mut engine) = test_state();
        state.shutdown.set_ready();
        tokio::task::block_in_place(|| engine.shutdown());

        let get = GetRequest { key: b"k".to_vec() };
        let response = get_handler(State(state), encode(&get)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
