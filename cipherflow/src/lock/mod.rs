//! Distributed lease-lock seam.
//!
//! Horizontal scaling runs several orchestrator instances against the same
//! program; only one may submit state-changing transactions at a time. The
//! lease is acquired from an external coordination service before every
//! submission. Lease renewal (heartbeat) is the service's responsibility,
//! not the orchestrator's. A lease is valid for its TTL and that is all
//! this crate assumes.

pub mod memory;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

pub use memory::MemoryLockService;

/// A granted lease. Pass back to [`LockService::release`] when done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseHandle {
    /// Lock name the lease was granted under.
    pub name: String,
    /// Fencing token distinguishing this grant from earlier ones.
    pub token: u64,
}

/// Errors from the lock backend.
///
/// Contention is not an error: a held lock surfaces as `Ok(None)` from
/// [`LockService::acquire`].
#[derive(Debug, Clone, Error)]
pub enum LockError {
    /// The coordination service could not be reached.
    #[error("lock backend unavailable: {0}")]
    Backend(String),
}

/// Lease-based mutual exclusion service.
pub trait LockService: Send + Sync + 'static {
    /// Attempts to acquire `name` for `ttl`. Returns `Ok(None)` if another
    /// holder currently has a live lease.
    fn acquire(
        &self,
        name: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<Option<LeaseHandle>, LockError>> + Send;

    /// Releases a lease. Releasing an expired or superseded lease is a
    /// no-op, not an error.
    fn release(&self, lease: LeaseHandle) -> impl Future<Output = Result<(), LockError>> + Send;

    /// Runs `f` under the lock, releasing afterwards.
    ///
    /// Returns `Ok(None)` without running `f` when the lock is contended.
    fn with_lock<F, Fut, T>(
        &self,
        name: &str,
        ttl: Duration,
        f: F,
    ) -> impl Future<Output = Result<Option<T>, LockError>> + Send
    where
        Self: Sized,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = T> + Send,
        T: Send,
    {
        async move {
            let Some(lease) = self.acquire(name, ttl).await? else {
                return Ok(None);
            };
            let out = f().await;
            self.release(lease).await?;
            Ok(Some(out))
        }
    }
}
