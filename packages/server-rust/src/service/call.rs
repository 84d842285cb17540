//! Per-request lifecycle state machine.
//!
//! ```text
//! Awaiting --deliver--> Executing --store op--> Completing --reply--> (dropped)
//! ```
//!
//! An [`AwaitingCall`] is parked on its queue slot. Delivery binds an
//! inbound operation, producing a [`Call`] that is published to the worker
//! channel; the worker that receives it owns it exclusively and drives it
//! with [`Call::advance`] until it is consumed.
//!
//! On entering EXECUTING the call registers a fresh AWAITING replacement
//! for its slot *before* touching the store, so the slot is never left
//! without a handler.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use bytes::Bytes;
use kvstore_core::{DeleteResponse, GetResponse, PutResponse};
use tracing::{debug, warn};

use super::operation::{OpKind, Operation, OperationResponse};
use super::queue::{EventQueue, Inbound, Reply};
use crate::storage::StorageEngine;

/// An AWAITING call parked on its `(queue, kind)` slot.
///
/// Only [`bind`](Self::bind) leaves this state, so a call without an
/// operation can never reach a worker.
#[derive(Debug)]
pub struct AwaitingCall {
    kind: OpKind,
}

impl AwaitingCall {
    #[must_use]
    pub(crate) fn new(kind: OpKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub fn kind(&self) -> OpKind {
        self.kind
    }

    /// AWAITING -> EXECUTING: binds the delivered operation.
    pub(crate) fn bind(self, inbound: Inbound) -> Call {
        debug_assert_eq!(inbound.op.kind(), self.kind);
        Call {
            kind: self.kind,
            state: CallState::Executing(inbound),
        }
    }
}

#[derive(Debug)]
enum CallState {
    Executing(Inbound),
    Completing {
        response: OperationResponse,
        reply: Reply,
    },
}

/// A bound call owned by the worker driving it.
#[derive(Debug)]
pub struct Call {
    kind: OpKind,
    state: CallState,
}

impl Call {
    #[must_use]
    pub fn kind(&self) -> OpKind {
        self.kind
    }

    #[must_use]
    pub fn is_executing(&self) -> bool {
        matches!(self.state, CallState::Executing(_))
    }

    /// Runs one transition. Returns the call in its next state, or `None`
    /// once it has reached its end and been released.
    pub(crate) fn advance(self, queue: &EventQueue, storage: &dyn StorageEngine) -> Option<Self> {
        let kind = self.kind;
        match self.state {
            CallState::Executing(Inbound { op, reply }) => {
                queue.register(AwaitingCall::new(kind));
                let response = execute(op, storage, queue.index());
                Some(Self {
                    kind,
                    state: CallState::Completing { response, reply },
                })
            }
            CallState::Completing { response, reply } => {
                if reply.send(Ok(response)).is_err() {
                    debug!(queue = queue.index(), kind = %kind, "caller went away before reply");
                }
                None
            }
        }
    }
}

/// Runs `op` against the store. A panic inside the store is contained and
/// reported as a fault response.
fn execute(op: Operation, storage: &dyn StorageEngine, queue: usize) -> OperationResponse {
    let kind = op.kind();
    let start = Instant::now();

    let response = match panic::catch_unwind(AssertUnwindSafe(move || apply(op, storage))) {
        Ok(response) => response,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(queue, kind = %kind, error = %message, "store operation faulted");
            OperationResponse::fault(kind, format!("internal error: {message}"))
        }
    };

    let elapsed = start.elapsed();
    let outcome = response.outcome();
    metrics::counter!(
        "kvstore_operations_total",
        "kind" => kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("kvstore_operation_duration_seconds", "kind" => kind.as_str())
        .record(elapsed.as_secs_f64());

    #[allow(clippy::cast_possible_truncation)]
    let duration_us = elapsed.as_micros() as u64;
    debug!(queue, kind = %kind, outcome, duration_us, "operation executed");
    response
}

fn apply(op: Operation, storage: &dyn StorageEngine) -> OperationResponse {
    match op {
        Operation::Put(req) => {
            storage.upsert(Bytes::from(req.key), Bytes::from(req.value));
            OperationResponse::Put(PutResponse::ok())
        }
        Operation::Get(req) => OperationResponse::Get(match storage.lookup(&req.key) {
            Some(value) => GetResponse::found(value.to_vec()),
            None => GetResponse::missing(),
        }),
        Operation::Delete(req) => {
            OperationResponse::Delete(DeleteResponse::removed(storage.remove(&req.key)))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "store operation panicked".to_string()
    }
}
