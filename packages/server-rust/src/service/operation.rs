//! Operation types flowing through the dispatch engine.

use std::fmt;

use kvstore_core::{
    DeleteRequest, DeleteResponse, GetRequest, GetResponse, PutRequest, PutResponse,
};

/// The supported operation kinds. Each one owns a slot on every queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Put,
    Get,
    Delete,
}

impl OpKind {
    /// Every kind, in slot order.
    pub const ALL: [OpKind; 3] = [OpKind::Put, OpKind::Get, OpKind::Delete];

    /// Label used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Get => "get",
            Self::Delete => "delete",
        }
    }

    /// Position of this kind's slot on a queue.
    #[must_use]
    pub(crate) fn slot(self) -> usize {
        match self {
            Self::Put => 0,
            Self::Get => 1,
            Self::Delete => 2,
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded inbound operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Put(PutRequest),
    Get(GetRequest),
    Delete(DeleteRequest),
}

impl Operation {
    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Put(_) => OpKind::Put,
            Self::Get(_) => OpKind::Get,
            Self::Delete(_) => OpKind::Delete,
        }
    }
}

/// The populated response for an [`Operation`] of the same kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResponse {
    Put(PutResponse),
    Get(GetResponse),
    Delete(DeleteResponse),
}

impl OperationResponse {
    /// Fault response for `kind` carrying `message` as error text.
    #[must_use]
    pub fn fault(kind: OpKind, message: impl Into<String>) -> Self {
        match kind {
            OpKind::Put => Self::Put(PutResponse::failed(message)),
            OpKind::Get => Self::Get(GetResponse::failed(message)),
            OpKind::Delete => Self::Delete(DeleteResponse::failed(message)),
        }
    }

    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Put(_) => OpKind::Put,
            Self::Get(_) => OpKind::Get,
            Self::Delete(_) => OpKind::Delete,
        }
    }

    /// Error text of an internal fault, if the operation hit one.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Put(r) => r.error.as_deref(),
            Self::Get(r) => r.error.as_deref(),
            Self::Delete(r) => r.error.as_deref(),
        }
    }

    #[must_use]
    pub fn is_fault(&self) -> bool {
        self.error().is_some()
    }

    /// Metrics outcome label: `ok`, `not_found`, or `fault`.
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        match self {
            _ if self.is_fault() => "fault",
            Self::Get(r) if !r.found => "not_found",
            Self::Delete(r) if !r.success => "not_found",
            _ => "ok",
        }
    }
}

/// Why an operation produced no response at all.
///
/// Normal outcomes, including faults inside the store, are always an
/// [`OperationResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// The engine stopped accepting operations before this one ran.
    #[error("server is shutting down")]
    ShuttingDown,
    /// The operation was accepted but its reply channel closed unanswered.
    #[error("operation dropped before completion")]
    Dropped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_distinct_and_ordered() {
        let slots: Vec<usize> = OpKind::ALL.iter().map(|k| k.slot()).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }

    #[test]
    fn fault_matches_kind() {
        for kind in OpKind::ALL {
            let response = OperationResponse::fault(kind, "boom");
            assert_eq!(response.kind(), kind);
            assert_eq!(response.error(), Some("boom"));
            assert_eq!(response.outcome(), "fault");
        }
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(OperationResponse::Put(PutResponse::ok()).outcome(), "ok");
        assert_eq!(OperationResponse::Get(GetResponse::missing()).outcome(), "not_found");
        assert_eq!(OperationResponse::Get(GetResponse::found(vec![])).outcome(), "ok");
        assert_eq!(OperationResponse::Delete(DeleteResponse::removed(false)).outcome(), "not_found");
        assert_eq!(OperationResponse::Delete(DeleteResponse::removed(true)).outcome(), "ok");
    }

    #[test]
    fn operation_kind() {
        let op = Operation::Get(GetRequest { key: b"k".to_vec() });
        assert_eq!(op.kind(), OpKind::Get);
        assert_eq!(op.kind().to_string(), "get");
    }
}
