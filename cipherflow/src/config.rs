//! Orchestrator configuration.
//!
//! Plain settings structs with compile-time defaults; the embedding
//! application owns whatever file or flag parsing produces them.

use std::time::Duration;

use crate::backend::ComputationBackend;
use crate::types::AccountRef;

// =============================================================================
// Configuration Constants
// =============================================================================

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Default reaper sweep interval.
pub const DEFAULT_REAPER_INTERVAL_MS: u64 = 10_000;

/// Default age after which an unresolved pending entry is evicted from the
/// working set (and left for re-discovery).
pub const DEFAULT_PENDING_TTL_SECS: u64 = 300;

/// Default age after which an unresolved request is expired terminally.
pub const DEFAULT_PENDING_HARD_CEILING_SECS: u64 = 3_600;

/// Default dedup ledger capacity.
pub const DEFAULT_DEDUP_CAPACITY: usize = 1_000;

/// Default dedup eviction batch size.
pub const DEFAULT_DEDUP_EVICT_BATCH: usize = 500;

/// Default bounded capacity of the event delivery channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for account reads and filtered scans.
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 5_000;

/// Default per-attempt submission timeout.
pub const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 10_000;

/// Default maximum submission attempts per processing pass.
pub const DEFAULT_MAX_SUBMIT_ATTEMPTS: u32 = 3;

/// Default initial backoff between submission attempts (doubles per retry).
pub const DEFAULT_SUBMIT_BACKOFF_MS: u64 = 200;

/// Default name of the cluster-wide writer lease.
pub const DEFAULT_LOCK_NAME: &str = "cipherflow-writer";

/// Default writer lease TTL.
pub const DEFAULT_LOCK_TTL_MS: u64 = 5_000;

// =============================================================================
// Settings
// =============================================================================

/// Bounded-retry settings for callback submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts per processing pass.
    pub max_attempts: u32,
    /// Deadline per attempt; expiry classifies as transient.
    pub attempt_timeout: Duration,
    /// Backoff before the second attempt; doubles per subsequent retry.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_SUBMIT_ATTEMPTS,
            attempt_timeout: Duration::from_millis(DEFAULT_SUBMIT_TIMEOUT_MS),
            initial_backoff: Duration::from_millis(DEFAULT_SUBMIT_BACKOFF_MS),
        }
    }
}

/// Configuration for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// The exchange program whose computations are orchestrated.
    pub program: AccountRef,
    /// Account holding the aggregate queued/completed counters.
    pub counters_account: AccountRef,
    /// Which MPC backend this instance runs against.
    pub backend: ComputationBackend,
    /// Poll tick interval.
    pub poll_interval: Duration,
    /// Stale-entry sweep interval.
    pub reaper_interval: Duration,
    /// Working-set eviction age for unresolved entries.
    pub pending_ttl: Duration,
    /// Terminal expiry age for unresolved entries.
    pub pending_hard_ceiling: Duration,
    /// Dedup ledger capacity (both paths).
    pub dedup_capacity: usize,
    /// Dedup ledger eviction batch (both paths).
    pub dedup_evict_batch: usize,
    /// Bounded capacity of the event delivery channel.
    pub event_channel_capacity: usize,
    /// Deadline for account reads and filtered scans.
    pub rpc_timeout: Duration,
    /// Callback submission retry settings.
    pub retry: RetryPolicy,
    /// Cluster-wide writer lease name.
    pub lock_name: String,
    /// Writer lease TTL.
    pub lock_ttl: Duration,
}

impl OrchestratorConfig {
    /// Creates a configuration for `program` with the counters record at
    /// `counters_account` and defaults everywhere else.
    pub fn new(program: AccountRef, counters_account: AccountRef) -> Self {
        Self {
            program,
            counters_account,
            backend: ComputationBackend::default(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            reaper_interval: Duration::from_millis(DEFAULT_REAPER_INTERVAL_MS),
            pending_ttl: Duration::from_secs(DEFAULT_PENDING_TTL_SECS),
            pending_hard_ceiling: Duration::from_secs(DEFAULT_PENDING_HARD_CEILING_SECS),
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            dedup_evict_batch: DEFAULT_DEDUP_EVICT_BATCH,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            rpc_timeout: Duration::from_millis(DEFAULT_RPC_TIMEOUT_MS),
            retry: RetryPolicy::default(),
            lock_name: DEFAULT_LOCK_NAME.to_string(),
            lock_ttl: Duration::from_millis(DEFAULT_LOCK_TTL_MS),
        }
    }

    /// Sets the computation backend.
    pub fn with_backend(mut self, backend: ComputationBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new(AccountRef::ZERO, AccountRef::ZERO)
    }
}
