//! In-memory lease-lock implementation.
//!
//! Single-process stand-in for the external coordination service, with the
//! same grant/expiry semantics: a lease is live until released or until its
//! TTL elapses, and stale releases are ignored via the fencing token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::lock::{LeaseHandle, LockError, LockService};

struct Grant {
    token: u64,
    expires_at: Instant,
}

/// In-process lease locks keyed by name.
pub struct MemoryLockService {
    grants: DashMap<String, Grant>,
    next_token: AtomicU64,
}

impl MemoryLockService {
    /// Creates an empty lock service.
    pub fn new() -> Self {
        Self {
            grants: DashMap::new(),
            next_token: AtomicU64::new(1),
        }
    }

    /// Returns true if `name` currently has a live lease.
    pub fn is_held(&self, name: &str) -> bool {
        self.grants
            .get(name)
            .map(|g| g.expires_at > Instant::now())
            .unwrap_or(false)
    }
}

impl Default for MemoryLockService {
    fn default() -> Self {
        Self::new()
    }
}

impl LockService for MemoryLockService {
    async fn acquire(
        &self,
        name: &str,
        ttl: Duration,
    ) -> Result<Option<LeaseHandle>, LockError> {
        let now = Instant::now();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);

        match self.grants.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if entry.get().expires_at > now {
                    return Ok(None);
                }
                // Expired grant: take it over
                entry.insert(Grant {
                    token,
                    expires_at: now + ttl,
                });
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Grant {
                    token,
                    expires_at: now + ttl,
                });
            }
        }

        Ok(Some(LeaseHandle {
            name: name.to_string(),
            token,
        }))
    }

    async fn release(&self, lease: LeaseHandle) -> Result<(), LockError> {
        self.grants
            .remove_if(&lease.name, |_, grant| grant.token == lease.token);
        Ok(())
    }
}
