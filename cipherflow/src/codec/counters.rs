//! Aggregate-counter record.
//!
//! A single small account the program keeps up to date with how many
//! computation requests have ever been queued and how many have completed.
//! The poller reads it first on every tick: when the two counters agree,
//! nothing is outstanding and the per-record scan is skipped entirely.
//!
//! Layout: discriminator(8) + `total_queued` u64 LE + `total_completed` u64 LE.

use crate::codec::discriminator::AGGREGATE_COUNTERS;
use crate::codec::wire::{ByteReader, ByteWriter, DecodeError};

/// Decoded aggregate counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregateCounters {
    /// Total computation requests ever queued.
    pub total_queued: u64,
    /// Total computation requests with a landed callback.
    pub total_completed: u64,
}

impl AggregateCounters {
    /// Encoded size of the record.
    pub const ENCODED_LEN: usize = 8 + 8 + 8;

    /// Number of requests still awaiting a result.
    ///
    /// Saturating: a completed count running ahead of the queued count (a
    /// torn read across two RPC calls) reads as zero outstanding.
    pub fn outstanding(&self) -> u64 {
        self.total_queued.saturating_sub(self.total_completed)
    }

    /// Encodes the record.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(Self::ENCODED_LEN);
        w.put_discriminator(AGGREGATE_COUNTERS);
        w.put_u64_le(self.total_queued);
        w.put_u64_le(self.total_completed);
        w.into_bytes()
    }

    /// Decodes the record.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = ByteReader::new(buf);
        r.read_discriminator(AGGREGATE_COUNTERS)?;
        let total_queued = r.read_u64_le()?;
        let total_completed = r.read_u64_le()?;
        r.finish()?;
        Ok(Self {
            total_queued,
            total_completed,
        })
    }
}
