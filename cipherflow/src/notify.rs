//! UI-facing completion notices.
//!
//! Every terminal outcome is published on a broadcast channel for whatever
//! user-facing surface the embedder runs. Publishing is fire-and-forget: a
//! lagging or absent receiver never blocks result processing.

use tokio::sync::broadcast;
use tracing::trace;

use crate::types::{ComputationKind, CorrelationId};

/// Default broadcast buffer per receiver.
pub const DEFAULT_NOTICE_CAPACITY: usize = 64;

/// Terminal outcome of a computation, as seen by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationOutcome {
    /// Callback landed on-chain.
    Completed,
    /// Terminally rejected or administratively skipped.
    Failed,
    /// Aged out without the remote party ever responding.
    Expired,
}

/// One published notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionNotice {
    /// Request the notice is about.
    pub correlation_id: CorrelationId,
    /// Kind of computation.
    pub kind: ComputationKind,
    /// How it ended.
    pub outcome: ComputationOutcome,
}

/// Broadcast fan-out of completion notices.
pub struct NoticeBroadcaster {
    tx: broadcast::Sender<CompletionNotice>,
}

impl NoticeBroadcaster {
    /// Creates a broadcaster with the given per-receiver buffer.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribes a new receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<CompletionNotice> {
        self.tx.subscribe()
    }

    /// Publishes a notice. Send errors (no receivers) are ignored.
    pub fn publish(&self, notice: CompletionNotice) {
        trace!(
            correlation_id = %notice.correlation_id,
            outcome = ?notice.outcome,
            "publishing completion notice"
        );
        let _ = self.tx.send(notice);
    }
}

impl Default for NoticeBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_CAPACITY)
    }
}
