//! Event-stream acquisition strategy.
//!
//! The transport pushes raw log messages into a bounded channel; a single
//! consumer loop drains them in delivery order. Per message: redelivered
//! signatures are skipped before the decoder runs, invalid transport
//! encodings are dropped silently, unknown discriminators are ignored, and
//! only a successfully decoded fresh event counts toward
//! `processed_events_count` and reaches the processor.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::alert::AlertSink;
use crate::codec::decode_event;
use crate::dedup::ProcessedSet;
use crate::ledger::{LedgerClient, LogMessage};
use crate::lock::LockService;
use crate::processor::{AcquisitionSource, ResultProcessor, ResultRecord};
use crate::status::OrchestratorMetrics;
use crate::types::Signature;

/// Drains one log subscription into the result processor.
pub struct EventConsumer<L, K, A> {
    processor: Arc<ResultProcessor<L, K, A>>,
    seen_events: Arc<ProcessedSet<Signature>>,
    metrics: Arc<OrchestratorMetrics>,
}

impl<L, K, A> EventConsumer<L, K, A>
where
    L: LedgerClient,
    K: LockService,
    A: AlertSink,
{
    /// Creates a consumer over shared orchestrator state.
    pub fn new(
        processor: Arc<ResultProcessor<L, K, A>>,
        seen_events: Arc<ProcessedSet<Signature>>,
        metrics: Arc<OrchestratorMetrics>,
    ) -> Self {
        Self {
            processor,
            seen_events,
            metrics,
        }
    }

    /// Handles one delivered message.
    pub async fn handle(&self, message: LogMessage) {
        // Redelivery check comes first so the decoder never re-runs
        if self.seen_events.contains(&message.signature) {
            trace!(signature = %message.signature, "duplicate event delivery skipped");
            return;
        }

        let bytes = match hex::decode(&message.payload) {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!(signature = %message.signature, "dropped log message with invalid encoding");
                return;
            }
        };

        let event = match decode_event(&bytes) {
            Ok(Some(event)) => event,
            Ok(None) => {
                trace!(signature = %message.signature, "unrecognized event discriminator ignored");
                return;
            }
            Err(err) => {
                debug!(
                    signature = %message.signature,
                    error = %err,
                    "dropped malformed event payload"
                );
                return;
            }
        };

        self.seen_events.insert(message.signature);
        self.metrics.record_event_processed();

        self.processor
            .process(
                ResultRecord {
                    correlation_id: event.correlation_id,
                    payload: event.payload,
                    source: AcquisitionSource::Event,
                },
                None,
            )
            .await;
    }

    /// Drains `messages` until cancelled or the transport closes the
    /// stream. Messages are dispatched one at a time, preserving delivery
    /// order within the subscription.
    pub async fn run(self, mut messages: mpsc::Receiver<LogMessage>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = messages.recv() => {
                    match next {
                        Some(message) => self.handle(message).await,
                        None => {
                            debug!("log stream closed by transport");
                            break;
                        }
                    }
                }
            }
        }
        debug!("event consumer stopped");
    }
}
