//! OS worker threads servicing one event queue each.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info_span};

use super::queue::EventQueue;
use crate::error::ServerError;
use crate::storage::StorageEngine;

/// Spawns a named OS thread that drives calls from `queue` until it closes.
///
/// # Errors
///
/// Returns [`ServerError::WorkerSpawn`] if the OS refuses the thread.
pub(crate) fn spawn_worker(
    queue: Arc<EventQueue>,
    storage: Arc<dyn StorageEngine>,
    worker: usize,
) -> Result<JoinHandle<()>, ServerError> {
    let name = format!("kv-q{}-w{worker}", queue.index());
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || run(&queue, storage.as_ref(), worker))
        .map_err(|source| ServerError::WorkerSpawn { name, source })
}

/// Worker loop. `next_event` is the only place the thread blocks; each call
/// is then advanced inline to completion on this thread.
fn run(queue: &EventQueue, storage: &dyn StorageEngine, worker: usize) {
    let span = info_span!("worker", queue = queue.index(), worker);
    let _entered = span.enter();
    debug!("worker started");

    let mut handled = 0u64;
    while let Some(call) = queue.next_event() {
        let mut next = Some(call);
        while let Some(call) = next {
            next = call.advance(queue, storage);
        }
        handled += 1;
    }

    debug!(handled, "worker stopped");
}
