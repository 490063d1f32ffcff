//! Computation-request record.
//!
//! One record per delegated computation, created by the exchange program
//! when it queues work for the MPC cluster and finalized when the callback
//! lands. The orchestrator only ever reads these.
//!
//! Layout:
//!
//! ```text
//! discriminator(8)
//! correlation_id(32)
//! kind(1)
//! status(1)
//! input  blob: u32 LE length + bytes
//! result blob: u32 LE length + bytes   (empty until the MPC reports)
//! related account a(32)
//! related account b(32)
//! queued_at i64 LE (unix seconds)
//! retry_count u8
//! ```

use crate::codec::discriminator::COMPUTATION_REQUEST;
use crate::codec::wire::{ByteReader, ByteWriter, DecodeError};
use crate::types::{AccountRef, ComputationKind, CorrelationId, RequestStatus};

/// Byte offset of the correlation id, used for filtered account scans.
pub const CORRELATION_ID_OFFSET: usize = 8;

/// Byte offset of the status byte, used for filtered account scans.
pub const STATUS_OFFSET: usize = 8 + CorrelationId::LEN + 1;

/// Decoded computation-request record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    /// Correlation id linking the record to its result.
    pub correlation_id: CorrelationId,
    /// Requested computation kind.
    pub kind: ComputationKind,
    /// On-chain lifecycle status.
    pub status: RequestStatus,
    /// Encrypted computation inputs (opaque to the orchestrator).
    pub input: Vec<u8>,
    /// Result blob; empty until the MPC cluster reports.
    pub result: Vec<u8>,
    /// Accounts the eventual callback must touch (e.g. the two orders).
    pub related_accounts: [AccountRef; 2],
    /// Unix seconds at which the request was queued.
    pub queued_at: i64,
    /// Callback attempts recorded on-chain.
    pub retry_count: u8,
}

impl RequestRecord {
    /// Encodes the record.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(
            8 + CorrelationId::LEN
                + 2
                + 4
                + self.input.len()
                + 4
                + self.result.len()
                + 2 * AccountRef::LEN
                + 8
                + 1,
        );
        w.put_discriminator(COMPUTATION_REQUEST);
        w.put_bytes(self.correlation_id.as_bytes());
        w.put_u8(self.kind.as_byte());
        w.put_u8(self.status.as_byte());
        w.put_var_bytes(&self.input);
        w.put_var_bytes(&self.result);
        w.put_bytes(self.related_accounts[0].as_bytes());
        w.put_bytes(self.related_accounts[1].as_bytes());
        w.put_i64_le(self.queued_at);
        w.put_u8(self.retry_count);
        w.into_bytes()
    }

    /// Decodes a full record, rejecting trailing bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = ByteReader::new(buf);
        r.read_discriminator(COMPUTATION_REQUEST)?;
        let correlation_id = CorrelationId(r.read_array::<32>()?);
        let kind = ComputationKind::from_byte(r.read_u8()?);
        let status_byte = r.read_u8()?;
        let status =
            RequestStatus::from_byte(status_byte).ok_or(DecodeError::InvalidStatus(status_byte))?;
        let input = r.read_var_bytes()?;
        let result = r.read_var_bytes()?;
        let related_accounts = [
            AccountRef(r.read_array::<32>()?),
            AccountRef(r.read_array::<32>()?),
        ];
        let queued_at = r.read_i64_le()?;
        let retry_count = r.read_u8()?;
        r.finish()?;
        Ok(Self {
            correlation_id,
            kind,
            status,
            input,
            result,
            related_accounts,
            queued_at,
            retry_count,
        })
    }

    /// Decodes only the header (discriminator + correlation id).
    ///
    /// Used when the record body turns out to be malformed: the id is still
    /// needed to mark that specific request failed.
    pub fn decode_header(buf: &[u8]) -> Result<CorrelationId, DecodeError> {
        let mut r = ByteReader::new(buf);
        r.read_discriminator(COMPUTATION_REQUEST)?;
        Ok(CorrelationId(r.read_array::<32>()?))
    }
}
