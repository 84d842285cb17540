//! Dispatch engine: N event queues, M worker threads per queue.
//!
//! [`DispatchEngine::start`] seeds every `(queue, kind)` slot with an
//! AWAITING call before any worker or listener runs, so the first inbound
//! operation always finds a slot prepared. The transport talks to the
//! engine only through the cloneable [`Dispatcher`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{info, warn};

use super::call::AwaitingCall;
use super::config::ServiceConfig;
use super::operation::{OpKind, Operation, OperationError, OperationResponse};
use super::queue::{EventQueue, Inbound};
use super::worker::spawn_worker;
use crate::error::ServerError;
use crate::storage::StorageEngine;

/// Owns the event queues and their worker threads.
///
/// Dropping the engine shuts it down.
pub struct DispatchEngine {
    config: ServiceConfig,
    queues: Arc<[Arc<EventQueue>]>,
    workers: Vec<JoinHandle<()>>,
    next_queue: Arc<AtomicUsize>,
}

impl DispatchEngine {
    /// Seeds every slot and spawns the worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Configuration`] for an empty pool and
    /// [`ServerError::WorkerSpawn`] if a thread cannot be started; threads
    /// already running are stopped before returning.
    pub fn start(config: ServiceConfig, storage: Arc<dyn StorageEngine>) -> Result<Self, ServerError> {
        config.validate()?;

        let queues: Arc<[Arc<EventQueue>]> = (0..config.queue_count)
            .map(|index| Arc::new(EventQueue::new(index)))
            .collect();
        for queue in queues.iter() {
            for kind in OpKind::ALL {
                queue.register(AwaitingCall::new(kind));
            }
        }

        let mut engine = Self {
            config,
            queues,
            workers: Vec::with_capacity(config.worker_count()),
            next_queue: Arc::new(AtomicUsize::new(0)),
        };

        for queue in engine.queues.iter() {
            for worker in 0..config.threads_per_queue {
                // On error `engine` drops here, closing the queues and
                // joining the workers spawned so far.
                let handle = spawn_worker(Arc::clone(queue), Arc::clone(&storage), worker)?;
                engine.workers.push(handle);
            }
        }

        info!(
            queues = config.queue_count,
            threads_per_queue = config.threads_per_queue,
            engine = storage.name(),
            "dispatch engine started"
        );
        Ok(engine)
    }

    /// Handle for submitting operations.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            queues: Arc::clone(&self.queues),
            next_queue: Arc::clone(&self.next_queue),
        }
    }

    #[must_use]
    pub fn config(&self) -> ServiceConfig {
        self.config
    }

    #[must_use]
    pub fn queues(&self) -> &[Arc<EventQueue>] {
        &self.queues
    }

    /// Stops accepting work on every queue, then joins every worker.
    ///
    /// Operations already handed to a worker run to completion; operations
    /// still waiting for a handler are answered with
    /// [`OperationError::ShuttingDown`]. Blocks the calling thread until all
    /// workers have exited. Idempotent.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() && self.queues.iter().all(|q| !q.is_accepting()) {
            return;
        }
        for queue in self.queues.iter() {
            queue.close();
        }
        let count = self.workers.len();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }
        info!(workers = count, "dispatch engine stopped");
    }
}

impl Drop for DispatchEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Cloneable submission handle used by the transport.
///
/// Picks queues round-robin and awaits the reply asynchronously; the
/// calling task never blocks on a worker.
#[derive(Clone)]
pub struct Dispatcher {
    queues: Arc<[Arc<EventQueue>]>,
    next_queue: Arc<AtomicUsize>,
}

impl Dispatcher {
    /// Submits `op` and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::ShuttingDown`] if the engine no longer
    /// accepts work, and [`OperationError::Dropped`] if the reply channel
    /// closed without an answer.
    pub async fn submit(&self, op: Operation) -> Result<OperationResponse, OperationError> {
        let index = self.next_queue.fetch_add(1, Ordering::Relaxed) % self.queues.len();
        let (inbound, rx) = Inbound::new(op);
        self.queues[index]
            .deliver(inbound)
            .map_err(|_| OperationError::ShuttingDown)?;
        rx.await.map_err(|_| OperationError::Dropped)?
    }

    #[must_use]
    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }
}
