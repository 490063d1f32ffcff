//! Callback instruction payload.
//!
//! The state-changing message submitted back to the ledger once a result is
//! available. Deterministic for a given correlation id and result blob, so
//! a retried submission is byte-identical to the original.
//!
//! Layout: discriminator(8) + correlation id(32) + result blob
//! (u32 LE length prefix + bytes).

use crate::codec::discriminator::CALLBACK_RESULT;
use crate::codec::wire::{ByteReader, ByteWriter, DecodeError};
use crate::types::CorrelationId;

/// Decoded callback instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackInstruction {
    /// Correlation id of the request being resolved.
    pub correlation_id: CorrelationId,
    /// Serialized result fields, produced by
    /// [`ResultPayload::to_blob`](crate::codec::event::ResultPayload::to_blob).
    pub result: Vec<u8>,
}

impl CallbackInstruction {
    /// Encodes the instruction payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(8 + CorrelationId::LEN + 4 + self.result.len());
        w.put_discriminator(CALLBACK_RESULT);
        w.put_bytes(self.correlation_id.as_bytes());
        w.put_var_bytes(&self.result);
        w.into_bytes()
    }

    /// Decodes an instruction payload.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = ByteReader::new(buf);
        r.read_discriminator(CALLBACK_RESULT)?;
        let correlation_id = CorrelationId(r.read_array::<32>()?);
        let result = r.read_var_bytes()?;
        r.finish()?;
        Ok(Self {
            correlation_id,
            result,
        })
    }
}
