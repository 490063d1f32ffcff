//! Orchestrator facade.
//!
//! Composes the result processor, both acquisition paths, and the stale
//! reaper over shared state, with every external collaborator (ledger
//! client, lock service, alert sink) injected at construction. `start` and
//! `stop` are idempotent; the acquisition paths run concurrently and are
//! cancelled together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::alert::{AlertLevel, AlertSink};
use crate::codec::RequestRecord;
use crate::config::OrchestratorConfig;
use crate::dedup::ProcessedSet;
use crate::error::OrchestratorError;
use crate::ledger::{LedgerClient, LedgerError, LogSubscription, SubscriptionHandle};
use crate::lock::LockService;
use crate::notify::{CompletionNotice, ComputationOutcome, NoticeBroadcaster};
use crate::poller::{outstanding_filters, PollSummary, Poller};
use crate::processor::{ProcessorSettings, ResultProcessor};
use crate::registry::{ClaimSet, PendingRegistry, ReaperSummary, StaleReaper};
use crate::status::{OrchestratorMetrics, PollerStatus, SubscriptionStatus};
use crate::subscription::EventConsumer;
use crate::types::{CorrelationId, Signature};

struct RunningTasks {
    cancel: CancellationToken,
    poll_task: JoinHandle<()>,
    event_task: JoinHandle<()>,
    reaper_task: JoinHandle<()>,
    subscription: SubscriptionHandle,
}

/// Asynchronous computation orchestrator.
///
/// Tracks outstanding computation requests, discovers results via polling
/// and the event stream, and writes them back on-chain exactly once each.
pub struct Orchestrator<L, K, A> {
    config: OrchestratorConfig,
    ledger: Arc<L>,
    alerts: Arc<A>,
    registry: Arc<PendingRegistry>,
    terminal: Arc<ProcessedSet<CorrelationId>>,
    seen_events: Arc<ProcessedSet<Signature>>,
    metrics: Arc<OrchestratorMetrics>,
    notices: Arc<NoticeBroadcaster>,
    processor: Arc<ResultProcessor<L, K, A>>,
    poller: Arc<Poller<L, K, A>>,
    reaper: Arc<StaleReaper<A>>,
    active: Arc<AtomicBool>,
    running: tokio::sync::Mutex<Option<RunningTasks>>,
}

impl<L, K, A> Orchestrator<L, K, A>
where
    L: LedgerClient,
    K: LockService,
    A: AlertSink,
{
    /// Builds an orchestrator from configuration and injected
    /// collaborators.
    pub fn new(config: OrchestratorConfig, ledger: Arc<L>, locks: Arc<K>, alerts: Arc<A>) -> Self {
        let registry = Arc::new(PendingRegistry::new());
        let terminal = Arc::new(ProcessedSet::with_capacity(
            config.dedup_capacity,
            config.dedup_evict_batch,
        ));
        let seen_events = Arc::new(ProcessedSet::with_capacity(
            config.dedup_capacity,
            config.dedup_evict_batch,
        ));
        let metrics = Arc::new(OrchestratorMetrics::new());
        let notices = Arc::new(NoticeBroadcaster::default());
        let active = Arc::new(AtomicBool::new(true));

        let processor = Arc::new(ResultProcessor::new(
            ProcessorSettings {
                program: config.program,
                backend: config.backend,
                retry: config.retry,
                lock_name: config.lock_name.clone(),
                lock_ttl: config.lock_ttl,
            },
            Arc::clone(&ledger),
            locks,
            Arc::clone(&alerts),
            Arc::clone(&registry),
            ClaimSet::new(),
            Arc::clone(&terminal),
            Arc::clone(&metrics),
            Arc::clone(&notices),
            Arc::clone(&active),
        ));
        let poller = Arc::new(Poller::new(
            Arc::clone(&ledger),
            Arc::clone(&processor),
            Arc::clone(&registry),
            config.program,
            config.counters_account,
            config.rpc_timeout,
        ));
        let reaper = Arc::new(StaleReaper::new(
            Arc::clone(&registry),
            Arc::clone(&terminal),
            Arc::clone(&metrics),
            Arc::clone(&alerts),
            Arc::clone(&notices),
            config.pending_ttl,
            config.pending_hard_ceiling,
        ));

        Self {
            config,
            ledger,
            alerts,
            registry,
            terminal,
            seen_events,
            metrics,
            notices,
            processor,
            poller,
            reaper,
            active,
            running: tokio::sync::Mutex::new(None),
        }
    }

    /// Starts result acquisition: poll loop, event-stream consumer, and
    /// stale reaper. Calling while already started is a no-op.
    pub async fn start(&self) -> Result<(), OrchestratorError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!("orchestrator already started");
            return Ok(());
        }

        let LogSubscription { handle, messages } = self
            .ledger
            .subscribe_logs(&self.config.program, self.config.event_channel_capacity)
            .await?;

        let cancel = CancellationToken::new();
        self.active.store(true, Ordering::Relaxed);
        self.metrics.set_polling(true);
        self.metrics.set_subscribed(true);

        let poll_task = tokio::spawn(
            Arc::clone(&self.poller).run(self.config.poll_interval, cancel.clone()),
        );
        let consumer = EventConsumer::new(
            Arc::clone(&self.processor),
            Arc::clone(&self.seen_events),
            Arc::clone(&self.metrics),
        );
        let event_task = tokio::spawn(consumer.run(messages, cancel.clone()));
        let reaper_task = tokio::spawn(
            Arc::clone(&self.reaper).run(self.config.reaper_interval, cancel.clone()),
        );

        *running = Some(RunningTasks {
            cancel,
            poll_task,
            event_task,
            reaper_task,
            subscription: handle,
        });
        info!(
            program = %self.config.program,
            backend = %self.config.backend,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "orchestrator started"
        );
        Ok(())
    }

    /// Stops acquisition: cancels the timers and unsubscribes the event
    /// stream. In-flight operations run to completion but their outcomes
    /// are discarded. Calling while not started is a no-op.
    pub async fn stop(&self) -> Result<(), OrchestratorError> {
        let mut running = self.running.lock().await;
        let Some(tasks) = running.take() else {
            debug!("orchestrator not started");
            return Ok(());
        };

        self.active.store(false, Ordering::Relaxed);
        tasks.cancel.cancel();

        if let Err(err) = self.ledger.unsubscribe(tasks.subscription).await {
            warn!(error = %err, "unsubscribe failed during shutdown");
        }

        let _ = tasks.poll_task.await;
        let _ = tasks.event_task.await;
        let _ = tasks.reaper_task.await;

        self.metrics.set_polling(false);
        self.metrics.set_subscribed(false);
        info!("orchestrator stopped");
        Ok(())
    }

    /// Returns true if acquisition is currently running.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Runs a single poll tick immediately, outside the timer.
    ///
    /// Outcomes discovered after [`stop`](Self::stop) are discarded.
    pub async fn poll_once(&self) -> Result<PollSummary, OrchestratorError> {
        Ok(self.poller.tick().await?)
    }

    /// Runs one stale-entry sweep immediately, outside the timer.
    pub fn sweep_stale(&self) -> ReaperSummary {
        self.reaper.sweep()
    }

    /// Marks every currently outstanding request as failed without
    /// attempting callbacks. Incident recovery for a confirmed-dead
    /// computation backend.
    ///
    /// Returns the number of requests skipped. Idempotent: with unchanged
    /// on-chain state a second invocation returns zero.
    pub async fn skip_all_pending(&self) -> Result<usize, OrchestratorError> {
        let records = tokio::time::timeout(
            self.config.rpc_timeout,
            self.ledger
                .read_accounts_by_filter(&self.config.program, &outstanding_filters()),
        )
        .await
        .map_err(|_| LedgerError::Timeout(self.config.rpc_timeout))??;

        let mut skipped = 0usize;
        for (account, data) in records {
            let Ok(id) = RequestRecord::decode_header(&data) else {
                debug!(account = %account, "skip pass dropped unreadable record");
                continue;
            };
            if !self.terminal.insert(id) {
                continue;
            }
            self.registry.remove(&id);
            skipped += 1;
            debug!(correlation_id = %id, "request administratively skipped");
            if let Ok(record) = RequestRecord::decode(&data) {
                self.notices.publish(CompletionNotice {
                    correlation_id: id,
                    kind: record.kind,
                    outcome: ComputationOutcome::Failed,
                });
            }
        }

        if skipped > 0 {
            self.metrics.record_failed_many(skipped as u64);
            self.alerts.notify(
                AlertLevel::Warning,
                "administratively skipped pending computations",
                &[("count", skipped.to_string())],
            );
            info!(skipped, "administrative skip complete");
        }
        Ok(skipped)
    }

    /// Snapshot of the polling path.
    pub fn poller_status(&self) -> PollerStatus {
        self.metrics.poller_status()
    }

    /// Snapshot of the event path.
    pub fn subscription_status(&self) -> SubscriptionStatus {
        self.metrics.subscription_status(self.registry.len())
    }

    /// Subscribes to UI-facing completion notices.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<CompletionNotice> {
        self.notices.subscribe()
    }

    /// Administrative counter reset.
    pub fn reset_counters(&self) {
        self.metrics.reset();
    }
}
