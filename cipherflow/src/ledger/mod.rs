//! Ledger RPC client seam.
//!
//! The orchestrator consumes the ledger through [`LedgerClient`]; the
//! concrete transport (RPC endpoints, websockets) lives with the embedding
//! application. [`MemoryLedger`] is the in-process implementation used by
//! tests and demo wiring.
//!
//! Errors carry their retry classification structurally; call sites match
//! on [`ErrorClass`], never on message text.

pub mod memory;
pub mod types;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::types::{AccountRef, Signature};

pub use memory::MemoryLedger;
pub use types::{AccountFilter, CallbackTransaction, LogMessage, LogSubscription, SubscriptionHandle};

/// Retry classification of a failed ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth retrying: the failure is environmental and may clear.
    Transient,
    /// Not worth retrying: the program rejected the operation itself.
    Terminal,
}

/// Structured rejection reasons published by the receiving program.
///
/// These are the rejections that cannot succeed on retry: resubmitting the
/// same callback yields the same answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCode {
    /// Callback accounts do not match the request's derivation.
    InvalidDerivation,
    /// The referenced request is not in a pending state.
    RequestNotPending,
    /// The request was already finalized by an earlier callback.
    AlreadyFinalized,
    /// The instruction payload failed the program's validation.
    InvalidPayload,
    /// The submitting authority is not permitted to resolve the request.
    Unauthorized,
}

impl fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidDerivation => "invalid account derivation",
            Self::RequestNotPending => "request not pending",
            Self::AlreadyFinalized => "request already finalized",
            Self::InvalidPayload => "invalid instruction payload",
            Self::Unauthorized => "unauthorized callback authority",
        };
        f.write_str(s)
    }
}

/// Errors from ledger operations.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Transport-level failure reaching the ledger.
    #[error("network error: {0}")]
    Network(String),

    /// An operation exceeded its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The transaction referenced a block hash that has expired.
    #[error("stale block reference")]
    StaleBlockReference,

    /// The transport closed an active subscription.
    #[error("subscription closed by transport")]
    SubscriptionClosed,

    /// The receiving program rejected the transaction.
    #[error("program rejected callback: {0}")]
    Rejected(RejectionCode),
}

impl LedgerError {
    /// Classifies the error for the retry wrapper.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Network(_)
            | Self::Timeout(_)
            | Self::StaleBlockReference
            | Self::SubscriptionClosed => ErrorClass::Transient,
            Self::Rejected(_) => ErrorClass::Terminal,
        }
    }

    /// Convenience predicate for [`ErrorClass::Transient`].
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// Read and submit surface of the ledger.
///
/// All operations may suspend on network I/O; callers wrap them in explicit
/// timeouts where a deadline matters.
pub trait LedgerClient: Send + Sync + 'static {
    /// Reads a single account's data, `None` if the account does not exist.
    fn read_account(
        &self,
        account: &AccountRef,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, LedgerError>> + Send;

    /// Reads all accounts of `program` whose data satisfies every filter.
    fn read_accounts_by_filter(
        &self,
        program: &AccountRef,
        filters: &[AccountFilter],
    ) -> impl Future<Output = Result<Vec<(AccountRef, Vec<u8>)>, LedgerError>> + Send;

    /// Subscribes to the log stream of `channel`.
    ///
    /// Messages are pushed into a bounded channel of the given capacity;
    /// the transport preserves delivery order per subscription.
    fn subscribe_logs(
        &self,
        channel: &AccountRef,
        capacity: usize,
    ) -> impl Future<Output = Result<LogSubscription, LedgerError>> + Send;

    /// Tears down a subscription created by [`Self::subscribe_logs`].
    fn unsubscribe(
        &self,
        handle: SubscriptionHandle,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Submits a transaction and waits for confirmation.
    fn submit_and_confirm(
        &self,
        tx: &CallbackTransaction,
    ) -> impl Future<Output = Result<Signature, LedgerError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_classify_transient() {
        assert_eq!(
            LedgerError::Network("refused".into()).class(),
            ErrorClass::Transient
        );
        assert_eq!(
            LedgerError::Timeout(Duration::from_secs(1)).class(),
            ErrorClass::Transient
        );
        assert_eq!(
            LedgerError::StaleBlockReference.class(),
            ErrorClass::Transient
        );
    }

    #[test]
    fn rejections_classify_terminal() {
        for code in [
            RejectionCode::InvalidDerivation,
            RejectionCode::RequestNotPending,
            RejectionCode::AlreadyFinalized,
            RejectionCode::InvalidPayload,
            RejectionCode::Unauthorized,
        ] {
            assert_eq!(LedgerError::Rejected(code).class(), ErrorClass::Terminal);
            assert!(!LedgerError::Rejected(code).is_transient());
        }
    }
}
