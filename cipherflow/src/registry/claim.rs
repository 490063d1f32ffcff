//! In-flight claims.
//!
//! Both acquisition paths can surface the same result near-simultaneously.
//! A claim is taken before any asynchronous submission work begins; the
//! second claimant observes the existing claim and exits early. Release is
//! tied to guard drop so no failure path, panic included, can leave an id
//! permanently wedged.

use std::sync::Arc;

use dashmap::DashMap;

use crate::types::CorrelationId;

/// Set of correlation ids currently being processed.
#[derive(Clone)]
pub struct ClaimSet {
    in_flight: Arc<DashMap<CorrelationId, ()>>,
}

impl ClaimSet {
    /// Creates an empty claim set.
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Attempts to claim `id`.
    ///
    /// Returns `None` if another claimant holds it. The entry API makes the
    /// check-and-insert atomic; there is no window for two winners.
    pub fn try_claim(&self, id: CorrelationId) -> Option<ClaimGuard> {
        match self.in_flight.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(());
                Some(ClaimGuard {
                    in_flight: Arc::clone(&self.in_flight),
                    id,
                })
            }
        }
    }

    /// Returns true if `id` is currently claimed.
    pub fn is_claimed(&self, id: &CorrelationId) -> bool {
        self.in_flight.contains_key(id)
    }

    /// Number of live claims.
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns true if no claims are live.
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

impl Default for ClaimSet {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII claim on one correlation id; dropping releases the claim.
pub struct ClaimGuard {
    in_flight: Arc<DashMap<CorrelationId, ()>>,
    id: CorrelationId,
}

impl ClaimGuard {
    /// The claimed id.
    pub fn id(&self) -> CorrelationId {
        self.id
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.id);
    }
}
