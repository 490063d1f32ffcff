//! 8-byte shape discriminators.
//!
//! Every on-chain record, event payload, and callback instruction opens with
//! a fixed 8-byte tag identifying its shape. Tags unknown to this build are
//! not an error: the event path silently ignores them so a newer program
//! version can add shapes without breaking older orchestrators.

use std::fmt;

/// Fixed-width tag prefixing a binary record or message.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Discriminator(pub [u8; 8]);

impl Discriminator {
    /// Width of a discriminator on the wire.
    pub const LEN: usize = 8;

    /// Returns the raw tag bytes.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Reads the tag from the start of a buffer, if long enough.
    pub fn peek(buf: &[u8]) -> Option<Discriminator> {
        if buf.len() < Self::LEN {
            return None;
        }
        let mut tag = [0u8; 8];
        tag.copy_from_slice(&buf[..Self::LEN]);
        Some(Discriminator(tag))
    }
}

impl fmt::Debug for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Discriminator({})", self)
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.iter().all(|b| b.is_ascii_graphic()) {
            for b in self.0 {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }
}

/// Aggregate queued/completed counter record.
pub const AGGREGATE_COUNTERS: Discriminator = Discriminator(*b"CMPCOUNT");

/// Computation-request record.
pub const COMPUTATION_REQUEST: Discriminator = Discriminator(*b"CMPREQST");

/// Price-comparison result event.
pub const EVENT_PRICE_COMPARED: Discriminator = Discriminator(*b"EVCMPARE");

/// Fill-calculation result event.
pub const EVENT_FILL_COMPUTED: Discriminator = Discriminator(*b"EVFILLED");

/// PnL-calculation result event.
pub const EVENT_PNL_COMPUTED: Discriminator = Discriminator(*b"EVPNLCAL");

/// Callback instruction writing a result back on-chain.
pub const CALLBACK_RESULT: Discriminator = Discriminator(*b"CBRESULT");
