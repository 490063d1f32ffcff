//! Result processor and callback dispatcher.
//!
//! Both acquisition paths hand their decoded results here. Processing is
//! idempotent per correlation id: a terminal id is a no-op, a concurrently
//! claimed id exits early, and the claim itself is an RAII guard so no
//! outcome path can leave an id wedged. The callback is submitted under the
//! cluster-wide writer lease through the bounded-retry wrapper; failures
//! are classified structurally into terminal (counted, alerted, absorbing)
//! and transient (request returns to pending, nothing counted).

pub mod retry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::alert::{AlertLevel, AlertSink};
use crate::backend::ComputationBackend;
use crate::codec::discriminator::COMPUTATION_REQUEST;
use crate::codec::record::CORRELATION_ID_OFFSET;
use crate::codec::{CallbackInstruction, DecodeError, RequestRecord, ResultPayload};
use crate::config::RetryPolicy;
use crate::dedup::ProcessedSet;
use crate::ledger::{AccountFilter, CallbackTransaction, LedgerClient, LedgerError};
use crate::lock::LockService;
use crate::notify::{CompletionNotice, ComputationOutcome, NoticeBroadcaster};
use crate::registry::{ClaimSet, ComputationRequest, PendingRegistry};
use crate::status::OrchestratorMetrics;
use crate::types::{AccountRef, CorrelationId};

pub use retry::{submit_with_retry, SubmitFailure};

/// Which acquisition path surfaced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionSource {
    /// Periodic account polling.
    Poll,
    /// Log-stream subscription.
    Event,
}

/// A decoded result ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    /// Request the result belongs to.
    pub correlation_id: CorrelationId,
    /// Kind-specific result fields.
    pub payload: ResultPayload,
    /// Path that surfaced the result.
    pub source: AcquisitionSource,
}

/// Outcome of one processing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Callback confirmed; the request is complete.
    Completed,
    /// The id was already terminal; nothing changed.
    AlreadyTerminal,
    /// Another pass holds the in-flight claim; nothing changed.
    AlreadyInFlight,
    /// No live request record could be found for the result.
    RequestUnknown,
    /// Transient failure; the request went back to pending.
    ReturnedTransient,
    /// Terminal failure; the request is failed for good.
    FailedTerminal,
    /// The orchestrator stopped mid-flight; the outcome was discarded.
    DiscardedInactive,
}

/// Construction-time settings for the processor.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    /// Program the callbacks are addressed to.
    pub program: AccountRef,
    /// Backend policy for unrecognized kinds.
    pub backend: ComputationBackend,
    /// Submission retry policy.
    pub retry: RetryPolicy,
    /// Cluster-wide writer lease name.
    pub lock_name: String,
    /// Writer lease TTL.
    pub lock_ttl: Duration,
}

/// Decodes results and dispatches callback transactions.
pub struct ResultProcessor<L, K, A> {
    settings: ProcessorSettings,
    ledger: Arc<L>,
    locks: Arc<K>,
    alerts: Arc<A>,
    registry: Arc<PendingRegistry>,
    claims: ClaimSet,
    terminal: Arc<ProcessedSet<CorrelationId>>,
    metrics: Arc<OrchestratorMetrics>,
    notices: Arc<NoticeBroadcaster>,
    active: Arc<AtomicBool>,
}

impl<L, K, A> ResultProcessor<L, K, A>
where
    L: LedgerClient,
    K: LockService,
    A: AlertSink,
{
    /// Creates a processor over shared orchestrator state.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: ProcessorSettings,
        ledger: Arc<L>,
        locks: Arc<K>,
        alerts: Arc<A>,
        registry: Arc<PendingRegistry>,
        claims: ClaimSet,
        terminal: Arc<ProcessedSet<CorrelationId>>,
        metrics: Arc<OrchestratorMetrics>,
        notices: Arc<NoticeBroadcaster>,
        active: Arc<AtomicBool>,
    ) -> Self {
        Self {
            settings,
            ledger,
            locks,
            alerts,
            registry,
            claims,
            terminal,
            metrics,
            notices,
            active,
        }
    }

    /// Returns true if the id has already reached a terminal state.
    pub fn is_terminal(&self, id: &CorrelationId) -> bool {
        self.terminal.contains(id)
    }

    /// Processes one decoded result.
    ///
    /// `request_hint` carries the full request when the caller already has
    /// it (poll path); the event path passes `None` and the request is
    /// resolved from the registry or the chain.
    pub async fn process(
        &self,
        record: ResultRecord,
        request_hint: Option<ComputationRequest>,
    ) -> ProcessOutcome {
        let id = record.correlation_id;

        if self.terminal.contains(&id) {
            debug!(correlation_id = %id, "result already terminal, ignoring");
            return ProcessOutcome::AlreadyTerminal;
        }

        // Claim released on drop, whatever happens below
        let Some(_claim) = self.claims.try_claim(id) else {
            debug!(correlation_id = %id, "result already being processed");
            return ProcessOutcome::AlreadyInFlight;
        };

        let Some(request) = self.resolve_request(id, request_hint).await else {
            debug!(
                correlation_id = %id,
                source = ?record.source,
                "no live request record for result"
            );
            return ProcessOutcome::RequestUnknown;
        };

        self.registry.observe(request.clone());
        self.registry.mark_processing(&id);

        if !request.kind.is_known() && !self.settings.backend.allows_generic_completion() {
            return self.fail_terminal(&request, "unserviceable computation kind", None);
        }

        let instruction = CallbackInstruction {
            correlation_id: id,
            result: record.payload.to_blob(),
        };
        let tx = CallbackTransaction {
            program: self.settings.program,
            accounts: vec![
                request.record_account,
                request.related_accounts[0],
                request.related_accounts[1],
            ],
            payload: instruction.encode(),
        };

        // At most one active writer cluster-wide
        let lease = match self
            .locks
            .acquire(&self.settings.lock_name, self.settings.lock_ttl)
            .await
        {
            Ok(Some(lease)) => lease,
            Ok(None) => {
                debug!(correlation_id = %id, "writer lease contended, deferring");
                self.registry.return_to_pending(&id);
                return ProcessOutcome::ReturnedTransient;
            }
            Err(err) => {
                warn!(correlation_id = %id, error = %err, "lock service unavailable, deferring");
                self.registry.return_to_pending(&id);
                return ProcessOutcome::ReturnedTransient;
            }
        };

        let submitted = submit_with_retry(
            &self.settings.retry,
            || self.ledger.submit_and_confirm(&tx),
            |err| err.class(),
            |attempt, err| {
                self.metrics.record_submit_retry();
                warn!(
                    correlation_id = %id,
                    attempt,
                    error = %err,
                    "callback submission retry"
                );
            },
        )
        .await;

        if let Err(err) = self.locks.release(lease).await {
            warn!(correlation_id = %id, error = %err, "failed to release writer lease");
        }

        if !self.active.load(Ordering::Relaxed) {
            debug!(correlation_id = %id, "orchestrator stopped, discarding late outcome");
            return ProcessOutcome::DiscardedInactive;
        }

        match submitted {
            Ok(signature) => {
                self.terminal.insert(id);
                self.registry.remove(&id);
                self.metrics.record_processed();
                info!(
                    correlation_id = %id,
                    kind = %request.kind,
                    signature = %signature,
                    source = ?record.source,
                    "callback confirmed"
                );
                self.notices.publish(CompletionNotice {
                    correlation_id: id,
                    kind: request.kind,
                    outcome: ComputationOutcome::Completed,
                });
                ProcessOutcome::Completed
            }
            Err(SubmitFailure::Terminal(err)) => {
                self.fail_terminal(&request, "callback rejected by program", Some(&err))
            }
            Err(SubmitFailure::RetriesExhausted(err)) => {
                debug!(
                    correlation_id = %id,
                    error = ?err,
                    "submission attempts exhausted, leaving request pending"
                );
                self.registry.return_to_pending(&id);
                ProcessOutcome::ReturnedTransient
            }
        }
    }

    /// Marks a request whose record body cannot be decoded as terminally
    /// failed. Returns false if the id was already terminal (the failure is
    /// counted at most once).
    pub fn fail_undecodable(
        &self,
        id: CorrelationId,
        account: AccountRef,
        err: &DecodeError,
    ) -> bool {
        if !self.terminal.insert(id) {
            return false;
        }
        self.registry.remove(&id);
        self.metrics.record_failed();
        warn!(
            correlation_id = %id,
            account = %account,
            error = %err,
            "undecodable request record, marking failed"
        );
        self.alerts.notify(
            AlertLevel::Critical,
            "undecodable computation record",
            &[
                ("correlation_id", id.to_string()),
                ("account", account.to_string()),
                ("error", err.to_string()),
            ],
        );
        true
    }

    fn fail_terminal(
        &self,
        request: &ComputationRequest,
        reason: &str,
        err: Option<&LedgerError>,
    ) -> ProcessOutcome {
        let id = request.correlation_id;
        self.terminal.insert(id);
        self.registry.remove(&id);
        self.metrics.record_failed();
        warn!(
            correlation_id = %id,
            kind = %request.kind,
            error = %err.map(|e| e.to_string()).unwrap_or_default(),
            "{}",
            reason
        );

        let mut context = vec![
            ("correlation_id", id.to_string()),
            ("kind", request.kind.name().to_string()),
            ("backend", self.settings.backend.name().to_string()),
        ];
        if let Some(err) = err {
            context.push(("error", err.to_string()));
        }
        self.alerts.notify(AlertLevel::Critical, reason, &context);

        self.notices.publish(CompletionNotice {
            correlation_id: id,
            kind: request.kind,
            outcome: ComputationOutcome::Failed,
        });
        ProcessOutcome::FailedTerminal
    }

    async fn resolve_request(
        &self,
        id: CorrelationId,
        hint: Option<ComputationRequest>,
    ) -> Option<ComputationRequest> {
        if let Some(request) = hint {
            return Some(request);
        }
        if let Some(request) = self.registry.get(&id) {
            return Some(request);
        }

        let filters = [
            AccountFilter::memcmp(0, COMPUTATION_REQUEST.as_bytes().to_vec()),
            AccountFilter::memcmp(CORRELATION_ID_OFFSET, id.as_bytes().to_vec()),
        ];
        match self
            .ledger
            .read_accounts_by_filter(&self.settings.program, &filters)
            .await
        {
            Ok(accounts) => accounts.into_iter().find_map(|(account, data)| {
                let record = RequestRecord::decode(&data).ok()?;
                if record.status.is_final() {
                    return None;
                }
                ComputationRequest::from_record(account, &record).ok()
            }),
            Err(err) => {
                warn!(correlation_id = %id, error = %err, "request record lookup failed");
                None
            }
        }
    }
}
