//! Core identifier and classification types shared across the crate.

use std::fmt;

/// Opaque fixed-width identifier linking a dispatched computation request to
/// its eventual result.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(pub [u8; 32]);

impl CorrelationId {
    /// Width of a correlation id on the wire.
    pub const LEN: usize = 32;

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Builds an id from a single byte, padding with zeros.
    ///
    /// Convenience for fixtures; production ids come off the wire.
    pub fn from_byte(b: u8) -> Self {
        let mut id = [0u8; 32];
        id[0] = b;
        Self(id)
    }
}

impl fmt::Debug for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CorrelationId({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short prefix is enough to correlate log lines
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Reference to a ledger account.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountRef(pub [u8; 32]);

impl AccountRef {
    /// Width of an account reference on the wire.
    pub const LEN: usize = 32;

    /// The all-zero reference, used as a placeholder in defaults.
    pub const ZERO: AccountRef = AccountRef([0u8; 32]);

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Builds a reference from a single byte, padding with zeros.
    pub fn from_byte(b: u8) -> Self {
        let mut id = [0u8; 32];
        id[0] = b;
        Self(id)
    }
}

impl fmt::Debug for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountRef({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Transaction (or delivery) signature.
///
/// Doubles as the delivery-specific dedup key on the event path, since the
/// transport may redeliver the same logical result under the same signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Builds a signature from a single byte, padding with zeros.
    pub fn from_byte(b: u8) -> Self {
        let mut sig = [0u8; 64];
        sig[0] = b;
        Self(sig)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// The kind of confidential computation a request asks for.
///
/// Unrecognized kind bytes are preserved as [`ComputationKind::Other`] so
/// records written by a newer program version still round-trip; whether they
/// can be serviced is a backend policy decision, not a decode error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComputationKind {
    /// Confidential price comparison between two orders.
    PriceCompare,
    /// Confidential fill amount calculation for a matched pair.
    FillCalculate,
    /// Confidential profit-and-loss calculation.
    PnlCalculate,
    /// Kind byte not known to this build.
    Other(u8),
}

impl ComputationKind {
    /// Wire encoding of the kind.
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::PriceCompare => 0,
            Self::FillCalculate => 1,
            Self::PnlCalculate => 2,
            Self::Other(b) => *b,
        }
    }

    /// Decodes a kind byte. Never fails; unknown bytes become `Other`.
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => Self::PriceCompare,
            1 => Self::FillCalculate,
            2 => Self::PnlCalculate,
            other => Self::Other(other),
        }
    }

    /// Returns true if this build knows how to interpret the kind.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PriceCompare => "price_compare",
            Self::FillCalculate => "fill_calculate",
            Self::PnlCalculate => "pnl_calculate",
            Self::Other(_) => "other",
        }
    }
}

impl fmt::Display for ComputationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(b) => write!(f, "other({:#04x})", b),
            known => f.write_str(known.name()),
        }
    }
}

/// On-chain lifecycle status of a computation-request record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    /// Awaiting a result callback.
    Queued,
    /// Callback landed; the record is final.
    Resolved,
    /// Cancelled on-chain before a result arrived.
    Cancelled,
}

impl RequestStatus {
    /// Wire encoding of the status.
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Resolved => 1,
            Self::Cancelled => 2,
        }
    }

    /// Decodes a status byte. Unknown bytes are a decode error at the call
    /// site (the status set is closed, unlike kinds).
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Queued),
            1 => Some(Self::Resolved),
            2 => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if the record can no longer accept a callback.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Queued)
    }
}
