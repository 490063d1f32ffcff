//! Polling acquisition strategy.
//!
//! On a fixed interval, reads the cheap aggregate counter pair first; only
//! when queued and completed diverge does it fetch the outstanding record
//! batch and evaluate each record. One malformed or failing record never
//! aborts the rest of the batch, and a failing tick never kills the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::alert::AlertSink;
use crate::codec::discriminator::COMPUTATION_REQUEST;
use crate::codec::record::STATUS_OFFSET;
use crate::codec::{AggregateCounters, RequestRecord, ResultPayload};
use crate::ledger::{AccountFilter, LedgerClient, LedgerError};
use crate::lock::LockService;
use crate::processor::{AcquisitionSource, ProcessOutcome, ResultProcessor, ResultRecord};
use crate::registry::{ComputationRequest, PendingRegistry};
use crate::types::{AccountRef, RequestStatus};

/// What one poll tick saw and did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Outstanding records fetched and evaluated.
    pub outstanding: usize,
    /// Requests completed this tick.
    pub completed: usize,
    /// Requests terminally failed this tick.
    pub failed: usize,
    /// Records observed but still awaiting their MPC result.
    pub awaiting: usize,
    /// Records skipped (already final on-chain or terminal locally).
    pub skipped: usize,
}

/// Returns the filters selecting unresolved computation-request records.
pub(crate) fn outstanding_filters() -> [AccountFilter; 2] {
    [
        AccountFilter::memcmp(0, COMPUTATION_REQUEST.as_bytes().to_vec()),
        AccountFilter::memcmp(STATUS_OFFSET, vec![RequestStatus::Queued.as_byte()]),
    ]
}

/// Periodic poll over the program's outstanding computation records.
pub struct Poller<L, K, A> {
    ledger: Arc<L>,
    processor: Arc<ResultProcessor<L, K, A>>,
    registry: Arc<PendingRegistry>,
    program: AccountRef,
    counters_account: AccountRef,
    rpc_timeout: Duration,
}

impl<L, K, A> Poller<L, K, A>
where
    L: LedgerClient,
    K: LockService,
    A: AlertSink,
{
    /// Creates a poller.
    pub fn new(
        ledger: Arc<L>,
        processor: Arc<ResultProcessor<L, K, A>>,
        registry: Arc<PendingRegistry>,
        program: AccountRef,
        counters_account: AccountRef,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            processor,
            registry,
            program,
            counters_account,
            rpc_timeout,
        }
    }

    async fn with_deadline<T>(
        &self,
        op: impl std::future::Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        tokio::time::timeout(self.rpc_timeout, op)
            .await
            .map_err(|_| LedgerError::Timeout(self.rpc_timeout))?
    }

    /// Runs one poll tick.
    pub async fn tick(&self) -> Result<PollSummary, LedgerError> {
        let mut summary = PollSummary::default();

        // Cheap fast path: nothing outstanding, skip record enumeration
        let Some(data) = self
            .with_deadline(self.ledger.read_account(&self.counters_account))
            .await?
        else {
            debug!(account = %self.counters_account, "aggregate counter record not found");
            return Ok(summary);
        };
        let counters = match AggregateCounters::decode(&data) {
            Ok(counters) => counters,
            Err(err) => {
                warn!(error = %err, "aggregate counter record undecodable");
                return Ok(summary);
            }
        };
        if counters.outstanding() == 0 {
            trace!(
                total_queued = counters.total_queued,
                "counters agree, nothing outstanding"
            );
            return Ok(summary);
        }

        let records = self
            .with_deadline(
                self.ledger
                    .read_accounts_by_filter(&self.program, &outstanding_filters()),
            )
            .await?;
        summary.outstanding = records.len();
        debug!(
            outstanding = counters.outstanding(),
            fetched = records.len(),
            "evaluating outstanding computation records"
        );

        for (account, data) in records {
            self.evaluate(account, &data, &mut summary).await;
        }

        Ok(summary)
    }

    /// Evaluates one fetched record. Failures affect only this record.
    async fn evaluate(&self, account: AccountRef, data: &[u8], summary: &mut PollSummary) {
        let record = match RequestRecord::decode(data) {
            Ok(record) => record,
            Err(err) => {
                // The body is bad; the header may still carry the id, in
                // which case the request itself is marked failed
                match RequestRecord::decode_header(data) {
                    Ok(id) => {
                        if self.processor.fail_undecodable(id, account, &err) {
                            summary.failed += 1;
                        } else {
                            summary.skipped += 1;
                        }
                    }
                    Err(_) => {
                        debug!(account = %account, error = %err, "dropped unreadable record");
                    }
                }
                return;
            }
        };

        let id = record.correlation_id;
        if record.status.is_final() || self.processor.is_terminal(&id) {
            summary.skipped += 1;
            return;
        }

        let request = match ComputationRequest::from_record(account, &record) {
            Ok(request) => request,
            Err(err) => {
                if self.processor.fail_undecodable(id, account, &err) {
                    summary.failed += 1;
                }
                return;
            }
        };
        self.registry.observe(request.clone());

        if record.result.is_empty() {
            // Queued but the MPC cluster has not reported yet
            summary.awaiting += 1;
            return;
        }

        let payload = match ResultPayload::from_record_parts(record.kind, &record.result) {
            Ok(payload) => payload,
            Err(err) => {
                if self.processor.fail_undecodable(id, account, &err) {
                    summary.failed += 1;
                }
                return;
            }
        };

        let outcome = self
            .processor
            .process(
                ResultRecord {
                    correlation_id: id,
                    payload,
                    source: AcquisitionSource::Poll,
                },
                Some(request),
            )
            .await;
        match outcome {
            ProcessOutcome::Completed => summary.completed += 1,
            ProcessOutcome::FailedTerminal => summary.failed += 1,
            _ => {}
        }
    }

    /// Runs poll ticks on `interval` until cancelled.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {
                    match self.tick().await {
                        Ok(summary) => {
                            if summary.outstanding > 0 {
                                debug!(
                                    outstanding = summary.outstanding,
                                    completed = summary.completed,
                                    failed = summary.failed,
                                    awaiting = summary.awaiting,
                                    "poll tick complete"
                                );
                            }
                        }
                        Err(err) => {
                            // The next tick starts fresh; a bad RPC window
                            // must not kill the loop
                            warn!(error = %err, "poll tick failed");
                        }
                    }
                }
            }
        }
        debug!("poll loop stopped");
    }
}
