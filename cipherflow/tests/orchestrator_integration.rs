//! Integration tests for the computation orchestrator.
//!
//! These tests drive the full composition (orchestrator, processor, both
//! acquisition paths, dedup ledgers, and reaper) against the in-memory
//! ledger and lock service, verifying:
//! - end-to-end result discovery and callback on both paths
//! - per-id idempotence when both paths race on the same result
//! - the aggregate-counter fast path
//! - duplicate and unrecognized event handling
//! - administrative skip and stale-entry expiry

use std::sync::Arc;
use std::time::Duration;

use cipherflow::alert::RecordingAlertSink;
use cipherflow::codec::event::{encode_price_compared, encode_unknown_event};
use cipherflow::codec::RequestRecord;
use cipherflow::config::{OrchestratorConfig, RetryPolicy};
use cipherflow::ledger::{LedgerError, LogMessage, MemoryLedger, RejectionCode};
use cipherflow::lock::MemoryLockService;
use cipherflow::{
    AccountRef, ComputationBackend, ComputationKind, CorrelationId, Orchestrator, RequestStatus,
    Signature,
};

// =============================================================================
// Test Helpers
// =============================================================================

const PROGRAM: u8 = 0xFE;
const COUNTERS: u8 = 0xC0;

type TestOrchestrator = Orchestrator<MemoryLedger, MemoryLockService, RecordingAlertSink>;

struct Harness {
    ledger: Arc<MemoryLedger>,
    alerts: Arc<RecordingAlertSink>,
    orchestrator: TestOrchestrator,
}

fn config(poll_interval: Duration) -> OrchestratorConfig {
    let mut config = OrchestratorConfig::new(
        AccountRef::from_byte(PROGRAM),
        AccountRef::from_byte(COUNTERS),
    )
    .with_backend(ComputationBackend::Production)
    .with_retry(RetryPolicy {
        max_attempts: 2,
        attempt_timeout: Duration::from_millis(500),
        initial_backoff: Duration::from_millis(1),
    });
    config.poll_interval = poll_interval;
    config.reaper_interval = Duration::from_secs(60);
    config
}

fn harness(poll_interval: Duration) -> Harness {
    let ledger = Arc::new(MemoryLedger::new(AccountRef::from_byte(COUNTERS)));
    let alerts = Arc::new(RecordingAlertSink::new());
    let orchestrator = Orchestrator::new(
        config(poll_interval),
        Arc::clone(&ledger),
        Arc::new(MemoryLockService::new()),
        Arc::clone(&alerts),
    );
    Harness {
        ledger,
        alerts,
        orchestrator,
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs() as i64
}

fn queued_record(id: u8, result: Vec<u8>) -> RequestRecord {
    RequestRecord {
        correlation_id: CorrelationId::from_byte(id),
        kind: ComputationKind::PriceCompare,
        status: RequestStatus::Queued,
        input: vec![0xAA; 16],
        result,
        related_accounts: [AccountRef::from_byte(0x20), AccountRef::from_byte(0x21)],
        queued_at: unix_now(),
        retry_count: 0,
    }
}

fn event_message(sig: u8, payload: &[u8]) -> LogMessage {
    LogMessage {
        signature: Signature::from_byte(sig),
        payload: hex::encode(payload),
    }
}

/// Polls `condition` every 10 ms until it holds or two seconds elapse.
async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// =============================================================================
// Poll path
// =============================================================================

#[tokio::test]
async fn poll_path_completes_a_ready_result_end_to_end() {
    let h = harness(Duration::from_millis(20));
    h.ledger
        .seed_request(AccountRef::from_byte(1), &queued_record(1, vec![1]));

    h.orchestrator.start().await.unwrap();

    assert!(wait_until(|| h.ledger.submitted_count() == 1).await);
    assert!(wait_until(|| h.orchestrator.poller_status().processed_count == 1).await);

    h.orchestrator.stop().await.unwrap();

    let status = h.orchestrator.poller_status();
    assert_eq!(status.processed_count, 1);
    assert_eq!(status.failed_count, 0);
    assert!(h.alerts.is_empty());

    // The callback resolved the record on-chain
    assert_eq!(h.ledger.read_counters().outstanding(), 0);
}

#[tokio::test]
async fn diverged_counters_fetch_exactly_the_outstanding_records() {
    let h = harness(Duration::from_secs(60));
    for id in 1..=5u8 {
        let mut record = queued_record(id, Vec::new());
        if id <= 3 {
            record.status = RequestStatus::Resolved;
        }
        h.ledger
            .set_account(AccountRef::from_byte(id), record.encode());
    }
    h.ledger.set_counters(5, 3);

    let summary = h.orchestrator.poll_once().await.unwrap();
    assert_eq!(summary.outstanding, 2);
}

#[tokio::test]
async fn malformed_record_fails_exactly_once_with_alert() {
    let h = harness(Duration::from_secs(60));
    let mut bytes = queued_record(1, vec![1]).encode();
    bytes.truncate(8 + 32 + 4);
    h.ledger.set_account(AccountRef::from_byte(1), bytes);
    h.ledger.set_counters(1, 0);

    let summary = h.orchestrator.poll_once().await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(h.orchestrator.poller_status().failed_count, 1);
    assert_eq!(h.alerts.len(), 1);

    // Re-polling the unchanged chain does not double-count
    let summary = h.orchestrator.poll_once().await.unwrap();
    assert_eq!(summary.failed, 0);
    assert_eq!(h.orchestrator.poller_status().failed_count, 1);
}

// =============================================================================
// Event path
// =============================================================================

#[tokio::test]
async fn event_path_completes_a_result_end_to_end() {
    let h = harness(Duration::from_secs(60));
    let record = queued_record(1, Vec::new());
    h.ledger.seed_request(AccountRef::from_byte(1), &record);

    h.orchestrator.start().await.unwrap();

    h.ledger.push_log(
        &AccountRef::from_byte(PROGRAM),
        event_message(1, &encode_price_compared(record.correlation_id, true)),
    );

    assert!(wait_until(|| h.ledger.submitted_count() == 1).await);
    assert!(
        wait_until(|| h.orchestrator.subscription_status().processed_events_count == 1).await
    );

    h.orchestrator.stop().await.unwrap();
    assert_eq!(h.orchestrator.poller_status().processed_count, 1);
}

#[tokio::test]
async fn unknown_event_discriminator_is_ignored() {
    let h = harness(Duration::from_secs(60));
    h.orchestrator.start().await.unwrap();

    h.ledger.push_log(
        &AccountRef::from_byte(PROGRAM),
        event_message(1, &encode_unknown_event(CorrelationId::from_byte(1))),
    );

    // Give the consumer a moment; nothing should be counted
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        h.orchestrator.subscription_status().processed_events_count,
        0
    );

    h.orchestrator.stop().await.unwrap();
}

#[tokio::test]
async fn duplicate_event_delivery_counts_once() {
    let h = harness(Duration::from_secs(60));
    let record = queued_record(1, Vec::new());
    h.ledger.seed_request(AccountRef::from_byte(1), &record);

    h.orchestrator.start().await.unwrap();

    let message = event_message(1, &encode_price_compared(record.correlation_id, true));
    h.ledger
        .push_log(&AccountRef::from_byte(PROGRAM), message.clone());
    h.ledger.push_log(&AccountRef::from_byte(PROGRAM), message);

    assert!(
        wait_until(|| h.orchestrator.subscription_status().processed_events_count == 1).await
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        h.orchestrator.subscription_status().processed_events_count,
        1
    );
    assert_eq!(h.ledger.submitted_count(), 1);

    h.orchestrator.stop().await.unwrap();
}

// =============================================================================
// Cross-path idempotence
// =============================================================================

#[tokio::test]
async fn both_paths_racing_yield_exactly_one_callback() {
    let h = harness(Duration::from_millis(10));
    let record = queued_record(1, vec![1]);
    h.ledger.seed_request(AccountRef::from_byte(1), &record);

    h.orchestrator.start().await.unwrap();

    // Fire the same logical result at the event path while the poller is
    // discovering it on its own
    for sig in 1..=5u8 {
        h.ledger.push_log(
            &AccountRef::from_byte(PROGRAM),
            event_message(sig, &encode_price_compared(record.correlation_id, true)),
        );
    }

    assert!(wait_until(|| h.ledger.submitted_count() >= 1).await);
    tokio::time::sleep(Duration::from_millis(200)).await;

    h.orchestrator.stop().await.unwrap();

    assert_eq!(h.ledger.submitted_count(), 1, "exactly one effective callback");
    assert_eq!(h.orchestrator.poller_status().processed_count, 1);
    assert_eq!(h.orchestrator.poller_status().failed_count, 0);
}

#[tokio::test]
async fn concurrent_poll_ticks_submit_once_per_request() {
    let h = harness(Duration::from_secs(60));
    h.ledger
        .seed_request(AccountRef::from_byte(1), &queued_record(1, vec![1]));

    let orchestrator = Arc::new(h.orchestrator);
    let ticks: Vec<_> = (0..8)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.poll_once().await })
        })
        .collect();
    for tick in futures::future::join_all(ticks).await {
        tick.unwrap().unwrap();
    }

    assert_eq!(h.ledger.submitted_count(), 1);
    assert_eq!(orchestrator.poller_status().processed_count, 1);
    assert_eq!(orchestrator.poller_status().failed_count, 0);
}

#[tokio::test]
async fn terminal_id_is_inert_on_later_deliveries() {
    let h = harness(Duration::from_secs(60));
    let record = queued_record(1, vec![1]);
    h.ledger.seed_request(AccountRef::from_byte(1), &record);

    // Complete via the poll path
    let summary = h.orchestrator.poll_once().await.unwrap();
    assert_eq!(summary.completed, 1);

    // Later event delivery for the same id changes nothing
    h.orchestrator.start().await.unwrap();
    h.ledger.push_log(
        &AccountRef::from_byte(PROGRAM),
        event_message(9, &encode_price_compared(record.correlation_id, true)),
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.orchestrator.stop().await.unwrap();

    assert_eq!(h.ledger.submitted_count(), 1);
    assert_eq!(h.orchestrator.poller_status().processed_count, 1);
}

// =============================================================================
// Failure classification
// =============================================================================

#[tokio::test]
async fn transient_then_success_never_counts_a_failure() {
    let h = harness(Duration::from_secs(60));
    h.ledger
        .seed_request(AccountRef::from_byte(1), &queued_record(1, vec![1]));
    h.ledger
        .fail_next_submit(LedgerError::Network("connection reset".into()));

    // First attempt fails transiently inside the retry wrapper, the retry
    // succeeds, all within one poll tick
    let summary = h.orchestrator.poll_once().await.unwrap();
    assert_eq!(summary.completed, 1);

    let status = h.orchestrator.poller_status();
    assert_eq!(status.processed_count, 1);
    assert_eq!(status.failed_count, 0);
    assert!(h.alerts.is_empty());
}

#[tokio::test]
async fn terminal_rejection_counts_exactly_one_failure() {
    let h = harness(Duration::from_secs(60));
    h.ledger
        .seed_request(AccountRef::from_byte(1), &queued_record(1, vec![1]));
    h.ledger
        .fail_next_submit(LedgerError::Rejected(RejectionCode::InvalidDerivation));

    let summary = h.orchestrator.poll_once().await.unwrap();
    assert_eq!(summary.failed, 1);

    let status = h.orchestrator.poller_status();
    assert_eq!(status.failed_count, 1);
    assert_eq!(status.processed_count, 0);
    assert_eq!(h.alerts.len(), 1);

    // Permanently unprocessable
    let summary = h.orchestrator.poll_once().await.unwrap();
    assert_eq!(summary.failed, 0);
    assert_eq!(h.orchestrator.poller_status().failed_count, 1);
}

// =============================================================================
// Administrative skip
// =============================================================================

#[tokio::test]
async fn skip_all_pending_marks_everything_failed_without_callbacks() {
    let h = harness(Duration::from_secs(60));
    for id in 1..=3u8 {
        h.ledger
            .seed_request(AccountRef::from_byte(id), &queued_record(id, vec![1]));
    }

    let skipped = h.orchestrator.skip_all_pending().await.unwrap();
    assert_eq!(skipped, 3);
    assert_eq!(h.orchestrator.poller_status().failed_count, 3);
    assert_eq!(h.ledger.submitted_count(), 0);

    // Unchanged chain: second invocation is a no-op
    assert_eq!(h.orchestrator.skip_all_pending().await.unwrap(), 0);
    assert_eq!(h.orchestrator.poller_status().failed_count, 3);
}

// =============================================================================
// Stale entries
// =============================================================================

#[tokio::test]
async fn stale_pending_entries_are_evicted_then_rediscovered() {
    let h = harness(Duration::from_secs(60));
    // Queued long past the TTL but inside the hard ceiling, result not ready
    let mut record = queued_record(1, Vec::new());
    record.queued_at = unix_now() - 600;
    h.ledger.seed_request(AccountRef::from_byte(1), &record);

    h.orchestrator.poll_once().await.unwrap();
    assert_eq!(h.orchestrator.subscription_status().pending_computations_count, 1);

    let summary = h.orchestrator.sweep_stale();
    assert_eq!(summary.evicted, 1);
    assert_eq!(summary.expired, 0);
    assert_eq!(h.orchestrator.subscription_status().pending_computations_count, 0);
    assert_eq!(h.orchestrator.poller_status().failed_count, 0);

    // Re-discovery brings it back
    h.orchestrator.poll_once().await.unwrap();
    assert_eq!(h.orchestrator.subscription_status().pending_computations_count, 1);
}

#[tokio::test]
async fn entries_past_the_hard_ceiling_expire_terminally() {
    let h = harness(Duration::from_secs(60));
    let mut record = queued_record(1, Vec::new());
    record.queued_at = unix_now() - 7_200;
    h.ledger.seed_request(AccountRef::from_byte(1), &record);

    h.orchestrator.poll_once().await.unwrap();
    let summary = h.orchestrator.sweep_stale();

    assert_eq!(summary.expired, 1);
    assert_eq!(h.orchestrator.poller_status().failed_count, 1);
    assert_eq!(h.alerts.len(), 1);

    // Expired is absorbing: the record is still queued on-chain but is
    // never picked up again
    let poll = h.orchestrator.poll_once().await.unwrap();
    assert_eq!(poll.skipped, 1);
    assert_eq!(h.orchestrator.sweep_stale().expired, 0);
    assert_eq!(h.orchestrator.poller_status().failed_count, 1);
}

// =============================================================================
// Notices
// =============================================================================

#[tokio::test]
async fn completion_notices_reach_subscribers() {
    let h = harness(Duration::from_secs(60));
    let mut notices = h.orchestrator.subscribe_notices();
    h.ledger
        .seed_request(AccountRef::from_byte(1), &queued_record(1, vec![1]));

    h.orchestrator.poll_once().await.unwrap();

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.correlation_id, CorrelationId::from_byte(1));
    assert_eq!(notice.kind, ComputationKind::PriceCompare);
}
