//! In-memory ledger implementation.
//!
//! Backs tests and demo wiring with the same observable semantics the real
//! chain exposes: account reads, filtered scans, bounded log subscriptions,
//! and callback submission that finalizes the referenced request record and
//! advances the aggregate completed counter.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::codec::{AggregateCounters, CallbackInstruction, RequestRecord};
use crate::ledger::types::{
    AccountFilter, CallbackTransaction, LogMessage, LogSubscription, SubscriptionHandle,
};
use crate::ledger::{LedgerClient, LedgerError, RejectionCode};
use crate::types::{AccountRef, RequestStatus, Signature};

/// In-process ledger with scriptable submission failures.
pub struct MemoryLedger {
    counters_account: AccountRef,
    accounts: DashMap<AccountRef, Vec<u8>>,
    subscribers: Mutex<HashMap<u64, (AccountRef, mpsc::Sender<LogMessage>)>>,
    next_handle: AtomicU64,
    submitted: Mutex<Vec<CallbackTransaction>>,
    scripted_failures: Mutex<VecDeque<LedgerError>>,
}

impl MemoryLedger {
    /// Creates an empty ledger whose aggregate counters live at
    /// `counters_account`.
    pub fn new(counters_account: AccountRef) -> Self {
        Self {
            counters_account,
            accounts: DashMap::new(),
            subscribers: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            submitted: Mutex::new(Vec::new()),
            scripted_failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Writes raw account data.
    pub fn set_account(&self, account: AccountRef, data: Vec<u8>) {
        self.accounts.insert(account, data);
    }

    /// Writes the aggregate counter record.
    pub fn set_counters(&self, total_queued: u64, total_completed: u64) {
        let counters = AggregateCounters {
            total_queued,
            total_completed,
        };
        self.accounts
            .insert(self.counters_account, counters.encode());
    }

    /// Seeds a computation-request record at `account` and bumps the queued
    /// counter.
    pub fn seed_request(&self, account: AccountRef, record: &RequestRecord) {
        self.accounts.insert(account, record.encode());
        let counters = self.read_counters();
        self.set_counters(counters.total_queued + 1, counters.total_completed);
    }

    /// Current aggregate counters (zero if the record is absent/malformed).
    pub fn read_counters(&self) -> AggregateCounters {
        self.accounts
            .get(&self.counters_account)
            .and_then(|data| AggregateCounters::decode(data.value()).ok())
            .unwrap_or_default()
    }

    /// Queues an error for the next `submit_and_confirm` call.
    ///
    /// Queued errors are consumed in order before any submission succeeds.
    pub fn fail_next_submit(&self, err: LedgerError) {
        self.scripted_failures
            .lock()
            .expect("scripted failures lock poisoned")
            .push_back(err);
    }

    /// Transactions accepted so far.
    pub fn submitted(&self) -> Vec<CallbackTransaction> {
        self.submitted
            .lock()
            .expect("submitted lock poisoned")
            .clone()
    }

    /// Number of accepted transactions.
    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().expect("submitted lock poisoned").len()
    }

    /// Pushes a log message to every subscriber of `channel`.
    ///
    /// Messages to a full subscriber channel are dropped, mirroring a
    /// transport that sheds load rather than blocking the publisher.
    pub fn push_log(&self, channel: &AccountRef, message: LogMessage) {
        let subscribers = self.subscribers.lock().expect("subscribers lock poisoned");
        for (channel_ref, sender) in subscribers.values() {
            if channel_ref == channel {
                if sender.try_send(message.clone()).is_err() {
                    debug!(channel = %channel, "dropped log message: subscriber channel full or closed");
                }
            }
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscribers lock poisoned")
            .len()
    }

    fn find_request_account(
        &self,
        correlation_id: &crate::types::CorrelationId,
    ) -> Option<(AccountRef, RequestRecord)> {
        for entry in self.accounts.iter() {
            if let Ok(record) = RequestRecord::decode(entry.value()) {
                if record.correlation_id == *correlation_id {
                    return Some((*entry.key(), record));
                }
            }
        }
        None
    }
}

impl LedgerClient for MemoryLedger {
    async fn read_account(&self, account: &AccountRef) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.accounts.get(account).map(|data| data.value().clone()))
    }

    async fn read_accounts_by_filter(
        &self,
        _program: &AccountRef,
        filters: &[AccountFilter],
    ) -> Result<Vec<(AccountRef, Vec<u8>)>, LedgerError> {
        let mut out = Vec::new();
        for entry in self.accounts.iter() {
            if filters.iter().all(|f| f.matches(entry.value())) {
                out.push((*entry.key(), entry.value().clone()));
            }
        }
        Ok(out)
    }

    async fn subscribe_logs(
        &self,
        channel: &AccountRef,
        capacity: usize,
    ) -> Result<LogSubscription, LedgerError> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .expect("subscribers lock poisoned")
            .insert(handle, (*channel, tx));
        Ok(LogSubscription {
            handle: SubscriptionHandle(handle),
            messages: rx,
        })
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), LedgerError> {
        self.subscribers
            .lock()
            .expect("subscribers lock poisoned")
            .remove(&handle.0);
        Ok(())
    }

    async fn submit_and_confirm(
        &self,
        tx: &CallbackTransaction,
    ) -> Result<Signature, LedgerError> {
        if let Some(err) = self
            .scripted_failures
            .lock()
            .expect("scripted failures lock poisoned")
            .pop_front()
        {
            return Err(err);
        }

        let instruction = CallbackInstruction::decode(&tx.payload)
            .map_err(|_| LedgerError::Rejected(RejectionCode::InvalidPayload))?;

        let (account, mut record) = self
            .find_request_account(&instruction.correlation_id)
            .ok_or(LedgerError::Rejected(RejectionCode::RequestNotPending))?;

        if record.status.is_final() {
            return Err(LedgerError::Rejected(RejectionCode::AlreadyFinalized));
        }

        record.status = RequestStatus::Resolved;
        record.result = instruction.result.clone();
        self.accounts.insert(account, record.encode());

        let counters = self.read_counters();
        self.set_counters(counters.total_queued, counters.total_completed + 1);

        let mut submitted = self.submitted.lock().expect("submitted lock poisoned");
        submitted.push(tx.clone());

        // Deterministic per (request, submission ordinal)
        let mut sig = [0u8; 64];
        sig[..32].copy_from_slice(instruction.correlation_id.as_bytes());
        sig[32..40].copy_from_slice(&(submitted.len() as u64).to_le_bytes());
        Ok(Signature(sig))
    }
}
