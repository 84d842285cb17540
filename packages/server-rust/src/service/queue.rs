//! Event queue: one slot per operation kind plus a completed-event channel.
//!
//! The queue implements "register interest, later deliver a completed
//! event":
//!
//! - [`EventQueue::register`] parks an [`AwaitingCall`] in its kind's slot.
//! - [`EventQueue::deliver`] hands an inbound operation to the parked call
//!   and pushes the resulting executing [`Call`] onto the event channel. With no call
//!   parked (the replacement has not been registered yet), the operation
//!   waits in the slot's FIFO backlog and is bound by the next `register`.
//! - Workers pull ready calls with [`EventQueue::next_event`].
//!
//! Slot state and event publication happen under the slot mutex, so an
//! operation is either bound to a call, waiting in the backlog, or refused.
//! Nothing falls between.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::call::{AwaitingCall, Call};
use super::operation::{OpKind, Operation, OperationError, OperationResponse};

/// Reply channel back to the transport.
pub type Reply = oneshot::Sender<Result<OperationResponse, OperationError>>;

/// An operation received from the transport together with its reply channel.
#[derive(Debug)]
pub struct Inbound {
    pub op: Operation,
    pub reply: Reply,
}

impl Inbound {
    /// Creates an inbound operation and the receiver its reply arrives on.
    #[must_use]
    pub fn new(op: Operation) -> (Self, oneshot::Receiver<Result<OperationResponse, OperationError>>) {
        let (reply, rx) = oneshot::channel();
        (Self { op, reply }, rx)
    }
}

#[derive(Debug, Default)]
struct Slot {
    awaiting: Option<AwaitingCall>,
    backlog: VecDeque<Inbound>,
}

/// One independent event queue serviced by its own worker threads.
#[derive(Debug)]
pub struct EventQueue {
    index: usize,
    slots: [Mutex<Slot>; 3],
    events: Mutex<Option<mpsc::UnboundedSender<Call>>>,
    receiver: Mutex<mpsc::UnboundedReceiver<Call>>,
    accepting: AtomicBool,
}

impl EventQueue {
    #[must_use]
    pub fn new(index: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            index,
            slots: Default::default(),
            events: Mutex::new(Some(tx)),
            receiver: Mutex::new(rx),
            accepting: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Registers interest in the next operation of `call`'s kind.
    ///
    /// A backlogged operation is bound immediately. Returns `false` when the
    /// queue is closed; the call is discarded.
    pub(crate) fn register(&self, call: AwaitingCall) -> bool {
        let mut slot = self.slots[call.kind().slot()].lock();
        if !self.is_accepting() {
            return false;
        }
        match slot.backlog.pop_front() {
            Some(inbound) => self.publish(call.bind(inbound)),
            None => {
                debug_assert!(slot.awaiting.is_none(), "slot already has an awaiting call");
                slot.awaiting = Some(call);
            }
        }
        true
    }

    /// Delivers an inbound operation to its kind's slot.
    ///
    /// # Errors
    ///
    /// Returns the operation back when the queue no longer accepts work.
    pub fn deliver(&self, inbound: Inbound) -> Result<(), Inbound> {
        let kind = inbound.op.kind();
        let mut slot = self.slots[kind.slot()].lock();
        if !self.is_accepting() {
            return Err(inbound);
        }
        match slot.awaiting.take() {
            Some(call) => self.publish(call.bind(inbound)),
            None => {
                debug!(queue = self.index, kind = %kind, "no awaiting call, operation backlogged");
                slot.backlog.push_back(inbound);
            }
        }
        Ok(())
    }

    /// Must be called with the slot lock held.
    fn publish(&self, call: Call) {
        if let Some(events) = self.events.lock().as_ref() {
            // The receiver lives as long as `self`, so sending cannot fail.
            let _ = events.send(call);
        }
    }

    /// Blocks the calling OS thread until a call is ready. Returns `None`
    /// once the queue is closed and every published event was taken.
    ///
    /// Must not be called from within an async runtime.
    pub(crate) fn next_event(&self) -> Option<Call> {
        self.receiver.lock().blocking_recv()
    }

    /// Stops accepting registrations and deliveries.
    ///
    /// Parked calls are discarded and backlogged operations are answered with
    /// [`OperationError::ShuttingDown`]. Events already published stay in the
    /// channel for the workers to finish; after them `next_event` yields
    /// `None`.
    pub fn close(&self) {
        self.accepting.store(false, Ordering::Release);
        let mut refused = 0usize;
        for slot in &self.slots {
            let mut slot = slot.lock();
            slot.awaiting = None;
            for inbound in slot.backlog.drain(..) {
                let _ = inbound.reply.send(Err(OperationError::ShuttingDown));
                refused += 1;
            }
        }
        self.events.lock().take();
        debug!(queue = self.index, refused, "event queue closed");
    }

    /// Kinds that currently have an awaiting call parked.
    #[must_use]
    pub fn awaiting_kinds(&self) -> Vec<OpKind> {
        OpKind::ALL
            .into_iter()
            .filter(|kind| self.slots[kind.slot()].lock().awaiting.is_some())
            .collect()
    }

    /// Operations waiting for a handler across all slots.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.slots.iter().map(|slot| slot.lock().backlog.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use kvstore_core::{GetRequest, PutRequest};

    use super::*;

    fn get(key: &[u8]) -> Operation {
        Operation::Get(GetRequest { key: key.to_vec() })
    }

    #[test]
    fn delivery_to_parked_call_publishes_event() {
        let queue = EventQueue::new(0);
        assert!(queue.register(AwaitingCall::new(OpKind::Get)));
        assert_eq!(queue.awaiting_kinds(), vec![OpKind::Get]);

        let (inbound, _rx) = Inbound::new(get(b"k"));
        queue.deliver(inbound).unwrap();
        assert!(queue.awaiting_kinds().is_empty());

        let call = queue.next_event().unwrap();
        assert_eq!(call.kind(), OpKind::Get);
        assert!(call.is_executing());
    }

    #[test]
    fn delivery_without_parked_call_is_backlogged() {
        let queue = EventQueue::new(0);
        let (first, _rx1) = Inbound::new(get(b"a"));
        let (second, _rx2) = Inbound::new(get(b"b"));
        queue.deliver(first).unwrap();
        queue.deliver(second).unwrap();
        assert_eq!(queue.backlog_len(), 2);

        assert!(queue.register(AwaitingCall::new(OpKind::Get)));
        assert_eq!(queue.backlog_len(), 1);
        assert!(queue.awaiting_kinds().is_empty());
        assert!(queue.next_event().is_some());
    }

    #[test]
    fn slots_are_per_kind() {
        let queue = EventQueue::new(0);
        queue.register(AwaitingCall::new(OpKind::Put));
        let (inbound, _rx) = Inbound::new(get(b"k"));
        queue.deliver(inbound).unwrap();

        assert_eq!(queue.awaiting_kinds(), vec![OpKind::Put]);
        assert_eq!(queue.backlog_len(), 1);
    }

    #[test]
    fn close_refuses_backlog_and_new_work() {
        let queue = EventQueue::new(3);
        let (parked, mut rx) = Inbound::new(Operation::Put(PutRequest::default()));
        queue.deliver(parked).unwrap();
        queue.register(AwaitingCall::new(OpKind::Get));

        queue.close();
        assert!(!queue.is_accepting());
        assert!(queue.awaiting_kinds().is_empty());
        assert_eq!(rx.try_recv().unwrap(), Err(OperationError::ShuttingDown));

        let (late, _late_rx) = Inbound::new(get(b"k"));
        assert!(queue.deliver(late).is_err());
        assert!(!queue.register(AwaitingCall::new(OpKind::Delete)));
        assert!(queue.next_event().is_none());
    }

    #[test]
    fn published_events_survive_close() {
        let queue = EventQueue::new(0);
        queue.register(AwaitingCall::new(OpKind::Get));
        let (inbound, _rx) = Inbound::new(get(b"k"));
        queue.deliver(inbound).unwrap();

        queue.close();
        assert!(queue.next_event().is_some());
        assert!(queue.next_event().is_none());
    }
}
