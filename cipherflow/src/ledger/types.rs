//! Ledger client data types.

use tokio::sync::mpsc;

use crate::types::{AccountRef, Signature};

/// A memcmp-style filter for account scans: the account data must contain
/// `bytes` verbatim at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFilter {
    /// Byte offset into the account data.
    pub offset: usize,
    /// Bytes that must match.
    pub bytes: Vec<u8>,
}

impl AccountFilter {
    /// Creates a filter matching `bytes` at `offset`.
    pub fn memcmp(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
        }
    }

    /// Returns true if `data` satisfies the filter.
    pub fn matches(&self, data: &[u8]) -> bool {
        data.len() >= self.offset + self.bytes.len()
            && &data[self.offset..self.offset + self.bytes.len()] == self.bytes.as_slice()
    }
}

/// Opaque handle identifying an active log subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// One message from the program log stream.
///
/// The payload arrives hex-encoded from the transport; decoding (and
/// dropping malformed encodings) is the subscriber's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    /// Delivery signature; the dedup key for redelivered messages.
    pub signature: Signature,
    /// Hex-encoded event payload.
    pub payload: String,
}

/// An active log subscription: the handle for unsubscribing plus the
/// bounded receiver the transport pushes messages into.
pub struct LogSubscription {
    /// Handle to pass to `unsubscribe`.
    pub handle: SubscriptionHandle,
    /// Delivery-ordered message stream.
    pub messages: mpsc::Receiver<LogMessage>,
}

/// A callback transaction ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackTransaction {
    /// Program the instruction is addressed to.
    pub program: AccountRef,
    /// Accounts the instruction touches: the request record first, then the
    /// related accounts.
    pub accounts: Vec<AccountRef>,
    /// Encoded callback instruction payload.
    pub payload: Vec<u8>,
}
