//! Pending computation registry.
//!
//! Tracks every request the orchestrator has observed but not yet resolved.
//! An entry is created the first time a request is seen (by either
//! acquisition path), mutated only by the result processor, and removed on
//! a terminal outcome or by the stale-entry reaper.
//!
//! Per-request lifecycle:
//!
//! ```text
//! Pending ──► Processing ──► Completed | Failed | Expired   (terminal)
//!    ▲             │
//!    └─────────────┘  transient submission failure
//! ```
//!
//! Terminal states are absorbing: the entry leaves the registry and the
//! correlation id enters the terminal dedup ledger.

pub mod claim;
pub mod reaper;

use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::codec::{DecodeError, RequestRecord};
use crate::types::{AccountRef, ComputationKind, CorrelationId};

pub use claim::{ClaimGuard, ClaimSet};
pub use reaper::{ReaperSummary, StaleReaper};

/// A computation request the orchestrator is tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputationRequest {
    /// Globally unique request identifier.
    pub correlation_id: CorrelationId,
    /// Requested computation kind.
    pub kind: ComputationKind,
    /// Account holding the on-chain request record.
    pub record_account: AccountRef,
    /// Accounts the callback must touch.
    pub related_accounts: [AccountRef; 2],
    /// When the request was queued on-chain.
    pub queued_at: DateTime<Utc>,
    /// Callback attempts made by this instance.
    pub retry_count: u32,
}

impl ComputationRequest {
    /// Builds a request from its on-chain record.
    pub fn from_record(
        record_account: AccountRef,
        record: &RequestRecord,
    ) -> Result<Self, DecodeError> {
        let queued_at = DateTime::<Utc>::from_timestamp(record.queued_at, 0)
            .ok_or(DecodeError::InvalidTimestamp(record.queued_at))?;
        Ok(Self {
            correlation_id: record.correlation_id,
            kind: record.kind,
            record_account,
            related_accounts: record.related_accounts,
            queued_at,
            retry_count: u32::from(record.retry_count),
        })
    }
}

/// Live processing state of a tracked request.
///
/// Terminal outcomes ([`Completed`](RequestState::Completed),
/// [`Failed`](RequestState::Failed), [`Expired`](RequestState::Expired))
/// never appear inside the registry (reaching one removes the entry) but
/// are part of the state machine for callers reporting outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Awaiting a result, or returned after a transient failure.
    Pending,
    /// Claimed by the processor; a callback attempt is in flight.
    Processing,
    /// Callback landed.
    Completed,
    /// Terminally rejected or skipped.
    Failed,
    /// Aged past the hard ceiling without resolution.
    Expired,
}

impl RequestState {
    /// Returns true for absorbing states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Expired)
    }
}

struct PendingEntry {
    request: ComputationRequest,
    state: RequestState,
    #[allow(dead_code)] // recorded for operator inspection in debug dumps
    first_seen: Instant,
}

/// Concurrent registry of unresolved requests.
///
/// Never holds two entries for the same correlation id.
pub struct PendingRegistry {
    entries: DashMap<CorrelationId, PendingEntry>,
}

impl PendingRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Records a request if it is not already tracked.
    ///
    /// Returns true if the entry is new. An existing entry is left
    /// untouched, whatever its state.
    pub fn observe(&self, request: ComputationRequest) -> bool {
        match self.entries.entry(request.correlation_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(PendingEntry {
                    request,
                    state: RequestState::Pending,
                    first_seen: Instant::now(),
                });
                true
            }
        }
    }

    /// Returns a copy of the tracked request, if any.
    pub fn get(&self, id: &CorrelationId) -> Option<ComputationRequest> {
        self.entries.get(id).map(|e| e.request.clone())
    }

    /// Transitions `Pending → Processing`. Returns false if the entry is
    /// missing or already processing.
    pub fn mark_processing(&self, id: &CorrelationId) -> bool {
        match self.entries.get_mut(id) {
            Some(mut entry) if entry.state == RequestState::Pending => {
                entry.state = RequestState::Processing;
                true
            }
            _ => false,
        }
    }

    /// Transitions `Processing → Pending` after a transient failure and
    /// bumps the retry count.
    pub fn return_to_pending(&self, id: &CorrelationId) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            if entry.state == RequestState::Processing {
                entry.state = RequestState::Pending;
                entry.request.retry_count += 1;
            }
        }
    }

    /// Removes an entry (terminal outcome or reaper eviction).
    pub fn remove(&self, id: &CorrelationId) -> Option<ComputationRequest> {
        self.entries.remove(id).map(|(_, e)| e.request)
    }

    /// Number of tracked requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of every entry with its state, for sweeps and admin ops.
    pub fn snapshot(&self) -> Vec<(ComputationRequest, RequestState)> {
        self.entries
            .iter()
            .map(|e| (e.request.clone(), e.state))
            .collect()
    }
}

impl Default for PendingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestStatus;

    fn request(id: u8) -> ComputationRequest {
        ComputationRequest {
            correlation_id: CorrelationId::from_byte(id),
            kind: ComputationKind::PriceCompare,
            record_account: AccountRef::from_byte(id),
            related_accounts: [AccountRef::from_byte(0x20), AccountRef::from_byte(0x21)],
            queued_at: Utc::now(),
            retry_count: 0,
        }
    }

    #[test]
    fn observe_is_first_write_wins() {
        let registry = PendingRegistry::new();
        assert!(registry.observe(request(1)));
        assert!(!registry.observe(request(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn processing_round_trip_bumps_retry_count() {
        let registry = PendingRegistry::new();
        registry.observe(request(1));
        let id = CorrelationId::from_byte(1);

        assert!(registry.mark_processing(&id));
        // Double-claim through the registry is rejected
        assert!(!registry.mark_processing(&id));

        registry.return_to_pending(&id);
        assert_eq!(registry.get(&id).unwrap().retry_count, 1);
        assert!(registry.mark_processing(&id));
    }

    #[test]
    fn remove_clears_entry() {
        let registry = PendingRegistry::new();
        registry.observe(request(1));
        let removed = registry.remove(&CorrelationId::from_byte(1));
        assert!(removed.is_some());
        assert!(registry.is_empty());
        assert!(registry.remove(&CorrelationId::from_byte(1)).is_none());
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(!RequestState::Pending.is_terminal());
        assert!(!RequestState::Processing.is_terminal());
        assert!(RequestState::Completed.is_terminal());
        assert!(RequestState::Failed.is_terminal());
        assert!(RequestState::Expired.is_terminal());
    }

    #[test]
    fn from_record_rejects_absurd_timestamp() {
        let record = RequestRecord {
            correlation_id: CorrelationId::from_byte(1),
            kind: ComputationKind::PriceCompare,
            status: RequestStatus::Queued,
            input: Vec::new(),
            result: Vec::new(),
            related_accounts: [AccountRef::from_byte(2), AccountRef::from_byte(3)],
            queued_at: i64::MAX,
            retry_count: 0,
        };
        let err = ComputationRequest::from_record(AccountRef::from_byte(1), &record).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidTimestamp(_)));
    }
}
