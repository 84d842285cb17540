//! Request dispatch: event queues, per-request state machines, worker threads.
//!
//! 1. **Queues** (`queue`): one slot per operation kind, each holding an
//!    AWAITING call or a backlog of operations that arrived before one
//! 2. **Calls** (`call`): the AWAITING -> EXECUTING -> COMPLETING state machine,
//!    with parked and bound calls as separate types
//! 3. **Workers** (`worker`): OS threads blocking on a queue's event channel
//! 4. **Engine** (`engine`): startup seeding, round-robin submission, shutdown

pub mod call;
pub mod config;
pub mod engine;
pub mod operation;
pub mod queue;
pub mod worker;

pub use call::{AwaitingCall, Call};
pub use config::ServiceConfig;
pub use engine::{DispatchEngine, Dispatcher};
pub use operation::{OpKind, Operation, OperationError, OperationResponse};
pub use queue::{EventQueue, Inbound};
