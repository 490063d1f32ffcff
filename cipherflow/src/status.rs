//! Operator-facing status counters.
//!
//! Lock-free atomic counters with `Relaxed` ordering: the counters are
//! independent measurements, no cross-counter ordering is needed. Counters
//! only ever move forward; the single exception is the explicit
//! administrative [`OrchestratorMetrics::reset`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Snapshot of the polling acquisition path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerStatus {
    /// Whether the poll timer is currently running.
    pub is_polling: bool,
    /// Results processed to completion.
    pub processed_count: u64,
    /// Requests terminally failed (rejections + expiries + skips).
    pub failed_count: u64,
}

/// Snapshot of the event-stream acquisition path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionStatus {
    /// Whether the log subscription is currently active.
    pub is_subscribed: bool,
    /// Events decoded and accepted from the stream.
    pub processed_events_count: u64,
    /// Requests currently tracked in the pending working set.
    pub pending_computations_count: usize,
}

/// Shared counters for one orchestrator instance.
pub struct OrchestratorMetrics {
    processed: AtomicU64,
    failed: AtomicU64,
    processed_events: AtomicU64,
    submit_retries: AtomicU64,
    is_polling: AtomicBool,
    is_subscribed: AtomicBool,
    start_time: Instant,
}

impl OrchestratorMetrics {
    /// Creates zeroed metrics.
    pub fn new() -> Self {
        Self {
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            processed_events: AtomicU64::new(0),
            submit_retries: AtomicU64::new(0),
            is_polling: AtomicBool::new(false),
            is_subscribed: AtomicBool::new(false),
            start_time: Instant::now(),
        }
    }

    /// Records a result processed to completion.
    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a terminal failure.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `n` terminal failures at once (administrative skip).
    pub fn record_failed_many(&self, n: u64) {
        self.failed.fetch_add(n, Ordering::Relaxed);
    }

    /// Records an accepted event from the log stream.
    pub fn record_event_processed(&self) {
        self.processed_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a submission retry attempt.
    pub fn record_submit_retry(&self) {
        self.submit_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Flags the poll timer as running or stopped.
    pub fn set_polling(&self, active: bool) {
        self.is_polling.store(active, Ordering::Relaxed);
    }

    /// Flags the log subscription as active or torn down.
    pub fn set_subscribed(&self, active: bool) {
        self.is_subscribed.store(active, Ordering::Relaxed);
    }

    /// Current processed count.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Current terminal-failure count.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Current accepted-event count.
    pub fn processed_events(&self) -> u64 {
        self.processed_events.load(Ordering::Relaxed)
    }

    /// Current submission-retry count.
    pub fn submit_retries(&self) -> u64 {
        self.submit_retries.load(Ordering::Relaxed)
    }

    /// Seconds since this instance was constructed.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Snapshot of the polling path.
    pub fn poller_status(&self) -> PollerStatus {
        PollerStatus {
            is_polling: self.is_polling.load(Ordering::Relaxed),
            processed_count: self.processed(),
            failed_count: self.failed(),
        }
    }

    /// Snapshot of the event path. `pending` is supplied by the registry.
    pub fn subscription_status(&self, pending: usize) -> SubscriptionStatus {
        SubscriptionStatus {
            is_subscribed: self.is_subscribed.load(Ordering::Relaxed),
            processed_events_count: self.processed_events(),
            pending_computations_count: pending,
        }
    }

    /// Administrative reset of all counters. Active flags are untouched.
    pub fn reset(&self) {
        self.processed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.processed_events.store(0, Ordering::Relaxed);
        self.submit_retries.store(0, Ordering::Relaxed);
    }
}

impl Default for OrchestratorMetrics {
    fn default() -> Self {
        Self::new()
    }
}
