//! Stale entry reaper.
//!
//! Bounds working-set growth for a long-lived process. Entries that sit
//! unresolved past the TTL are evicted from the registry, not failed, so
//! the next poll tick or event delivery re-discovers them with a clean
//! slate. Entries past the (much larger) hard ceiling are expired
//! terminally: a remote party that has not answered in that long is not
//! going to, and unbounded retry would pin the entry forever.
//!
//! Entries currently claimed by the processor are never touched.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::alert::{AlertLevel, AlertSink};
use crate::dedup::ProcessedSet;
use crate::notify::{CompletionNotice, ComputationOutcome, NoticeBroadcaster};
use crate::registry::{PendingRegistry, RequestState};
use crate::status::OrchestratorMetrics;
use crate::types::CorrelationId;

/// Result of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaperSummary {
    /// Entries evicted from the working set (re-discoverable).
    pub evicted: usize,
    /// Entries expired terminally.
    pub expired: usize,
}

/// Periodic sweeper over the pending registry.
pub struct StaleReaper<A> {
    registry: Arc<PendingRegistry>,
    terminal: Arc<ProcessedSet<CorrelationId>>,
    metrics: Arc<OrchestratorMetrics>,
    alerts: Arc<A>,
    notices: Arc<NoticeBroadcaster>,
    ttl: chrono::Duration,
    hard_ceiling: chrono::Duration,
}

impl<A: AlertSink> StaleReaper<A> {
    /// Creates a reaper over the given registry.
    pub fn new(
        registry: Arc<PendingRegistry>,
        terminal: Arc<ProcessedSet<CorrelationId>>,
        metrics: Arc<OrchestratorMetrics>,
        alerts: Arc<A>,
        notices: Arc<NoticeBroadcaster>,
        ttl: Duration,
        hard_ceiling: Duration,
    ) -> Self {
        Self {
            registry,
            terminal,
            metrics,
            alerts,
            notices,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            hard_ceiling: chrono::Duration::from_std(hard_ceiling).unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Sweeps the registry once.
    pub fn sweep(&self) -> ReaperSummary {
        let now = Utc::now();
        let mut summary = ReaperSummary::default();

        for (request, state) in self.registry.snapshot() {
            if state == RequestState::Processing {
                continue;
            }
            let age = now.signed_duration_since(request.queued_at);
            if age >= self.hard_ceiling {
                // Terminal: stop re-discovering a request whose remote party
                // has gone silent for good
                if self.terminal.insert(request.correlation_id) {
                    self.registry.remove(&request.correlation_id);
                    self.metrics.record_failed();
                    warn!(
                        correlation_id = %request.correlation_id,
                        kind = %request.kind,
                        age_secs = age.num_seconds(),
                        "computation expired past hard ceiling"
                    );
                    self.alerts.notify(
                        AlertLevel::Warning,
                        "computation expired without a result",
                        &[
                            ("correlation_id", request.correlation_id.to_string()),
                            ("kind", request.kind.name().to_string()),
                            ("age_secs", age.num_seconds().to_string()),
                        ],
                    );
                    self.notices.publish(CompletionNotice {
                        correlation_id: request.correlation_id,
                        kind: request.kind,
                        outcome: ComputationOutcome::Expired,
                    });
                    summary.expired += 1;
                }
            } else if age >= self.ttl {
                // Free the memory; the next acquisition pass may bring the
                // entry back with a fresh retry budget
                self.registry.remove(&request.correlation_id);
                debug!(
                    correlation_id = %request.correlation_id,
                    age_secs = age.num_seconds(),
                    "evicted stale pending entry"
                );
                summary.evicted += 1;
            }
        }

        summary
    }

    /// Runs sweeps on `interval` until cancelled.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {
                    let summary = self.sweep();
                    if summary.evicted > 0 || summary.expired > 0 {
                        debug!(
                            evicted = summary.evicted,
                            expired = summary.expired,
                            "reaper sweep complete"
                        );
                    }
                }
            }
        }
    }
}
