//! Result event payloads from the program log stream.
//!
//! Each event opens with an 8-byte discriminator followed by kind-specific
//! fixed fields. Decoding goes through a registry mapping known tags to
//! typed decoder functions; tags outside the registry are not an error:
//! [`decode_event`] returns `Ok(None)` and the subscription path ignores
//! the message.

use crate::codec::discriminator::{
    self, Discriminator, EVENT_FILL_COMPUTED, EVENT_PNL_COMPUTED, EVENT_PRICE_COMPARED,
};
use crate::codec::wire::{ByteReader, ByteWriter, DecodeError};
use crate::types::{ComputationKind, CorrelationId};

/// Width of the fixed ciphertext blobs carried by fill and PnL results.
pub const CIPHERTEXT_LEN: usize = 64;

/// Kind-specific result fields, decoded from either acquisition path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultPayload {
    /// Outcome of a confidential price comparison.
    PriceCompared {
        /// Whether the two orders cross.
        matched: bool,
    },
    /// Encrypted fill amounts for a matched pair.
    FillComputed {
        /// Ciphertext blob, opaque to the orchestrator.
        fill: [u8; CIPHERTEXT_LEN],
    },
    /// Encrypted PnL figures.
    PnlComputed {
        /// Ciphertext blob, opaque to the orchestrator.
        pnl: [u8; CIPHERTEXT_LEN],
    },
    /// Raw result blob for a kind this build does not recognize.
    ///
    /// Only the poll path produces this (the record carries the blob
    /// verbatim); unrecognized event discriminators are dropped earlier.
    Opaque(Vec<u8>),
}

impl ResultPayload {
    /// Builds a payload from a record's kind byte and result blob.
    ///
    /// A blob whose size contradicts the kind is a decode error; unknown
    /// kinds accept any blob verbatim.
    pub fn from_record_parts(kind: ComputationKind, blob: &[u8]) -> Result<Self, DecodeError> {
        match kind {
            ComputationKind::PriceCompare => {
                if blob.len() != 1 {
                    return Err(DecodeError::BadResultLength {
                        kind: kind.name(),
                        expected: 1,
                        got: blob.len(),
                    });
                }
                Ok(Self::PriceCompared {
                    matched: blob[0] != 0,
                })
            }
            ComputationKind::FillCalculate => {
                let fill = fixed_blob(kind, blob)?;
                Ok(Self::FillComputed { fill })
            }
            ComputationKind::PnlCalculate => {
                let pnl = fixed_blob(kind, blob)?;
                Ok(Self::PnlComputed { pnl })
            }
            ComputationKind::Other(_) => Ok(Self::Opaque(blob.to_vec())),
        }
    }

    /// Serializes the payload into the blob carried by the callback
    /// instruction. Deterministic for a given payload.
    pub fn to_blob(&self) -> Vec<u8> {
        match self {
            Self::PriceCompared { matched } => vec![u8::from(*matched)],
            Self::FillComputed { fill } => fill.to_vec(),
            Self::PnlComputed { pnl } => pnl.to_vec(),
            Self::Opaque(blob) => blob.clone(),
        }
    }
}

fn fixed_blob(
    kind: ComputationKind,
    blob: &[u8],
) -> Result<[u8; CIPHERTEXT_LEN], DecodeError> {
    if blob.len() != CIPHERTEXT_LEN {
        return Err(DecodeError::BadResultLength {
            kind: kind.name(),
            expected: CIPHERTEXT_LEN,
            got: blob.len(),
        });
    }
    let mut out = [0u8; CIPHERTEXT_LEN];
    out.copy_from_slice(blob);
    Ok(out)
}

/// A decoded result event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEvent {
    /// Correlation id of the request this result belongs to.
    pub correlation_id: CorrelationId,
    /// Kind-specific result fields.
    pub payload: ResultPayload,
}

/// Typed decoder for one event shape. The discriminator has already been
/// matched; `buf` is the full payload including the tag.
pub type EventDecoder = fn(&[u8]) -> Result<ResultEvent, DecodeError>;

/// Registry of known event shapes.
pub const EVENT_DECODERS: &[(Discriminator, EventDecoder)] = &[
    (EVENT_PRICE_COMPARED, decode_price_compared),
    (EVENT_FILL_COMPUTED, decode_fill_computed),
    (EVENT_PNL_COMPUTED, decode_pnl_computed),
];

/// Decodes an event payload via the registry.
///
/// Returns `Ok(None)` for buffers too short to carry a tag or whose tag is
/// not in the registry. Returns `Err` only when a *known* shape is
/// malformed.
pub fn decode_event(buf: &[u8]) -> Result<Option<ResultEvent>, DecodeError> {
    let Some(tag) = Discriminator::peek(buf) else {
        return Ok(None);
    };
    for (known, decoder) in EVENT_DECODERS {
        if *known == tag {
            return decoder(buf).map(Some);
        }
    }
    Ok(None)
}

fn decode_price_compared(buf: &[u8]) -> Result<ResultEvent, DecodeError> {
    let mut r = ByteReader::new(buf);
    r.read_discriminator(EVENT_PRICE_COMPARED)?;
    let correlation_id = CorrelationId(r.read_array::<32>()?);
    let matched = r.read_u8()? != 0;
    r.finish()?;
    Ok(ResultEvent {
        correlation_id,
        payload: ResultPayload::PriceCompared { matched },
    })
}

fn decode_fill_computed(buf: &[u8]) -> Result<ResultEvent, DecodeError> {
    let mut r = ByteReader::new(buf);
    r.read_discriminator(EVENT_FILL_COMPUTED)?;
    let correlation_id = CorrelationId(r.read_array::<32>()?);
    let fill = r.read_array::<CIPHERTEXT_LEN>()?;
    r.finish()?;
    Ok(ResultEvent {
        correlation_id,
        payload: ResultPayload::FillComputed { fill },
    })
}

fn decode_pnl_computed(buf: &[u8]) -> Result<ResultEvent, DecodeError> {
    let mut r = ByteReader::new(buf);
    r.read_discriminator(EVENT_PNL_COMPUTED)?;
    let correlation_id = CorrelationId(r.read_array::<32>()?);
    let pnl = r.read_array::<CIPHERTEXT_LEN>()?;
    r.finish()?;
    Ok(ResultEvent {
        correlation_id,
        payload: ResultPayload::PnlComputed { pnl },
    })
}

/// Encodes a price-comparison event. Fixture counterpart of the decoder.
pub fn encode_price_compared(correlation_id: CorrelationId, matched: bool) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(8 + CorrelationId::LEN + 1);
    w.put_discriminator(EVENT_PRICE_COMPARED);
    w.put_bytes(correlation_id.as_bytes());
    w.put_u8(u8::from(matched));
    w.into_bytes()
}

/// Encodes a fill-calculation event.
pub fn encode_fill_computed(correlation_id: CorrelationId, fill: &[u8; CIPHERTEXT_LEN]) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(8 + CorrelationId::LEN + CIPHERTEXT_LEN);
    w.put_discriminator(EVENT_FILL_COMPUTED);
    w.put_bytes(correlation_id.as_bytes());
    w.put_bytes(fill);
    w.into_bytes()
}

/// Encodes a PnL-calculation event.
pub fn encode_pnl_computed(correlation_id: CorrelationId, pnl: &[u8; CIPHERTEXT_LEN]) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(8 + CorrelationId::LEN + CIPHERTEXT_LEN);
    w.put_discriminator(EVENT_PNL_COMPUTED);
    w.put_bytes(correlation_id.as_bytes());
    w.put_bytes(pnl);
    w.into_bytes()
}

/// Encodes an event under a tag the registry does not know.
///
/// Exists for exercising the ignore path; production code never emits it.
pub fn encode_unknown_event(correlation_id: CorrelationId) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(8 + CorrelationId::LEN);
    w.put_discriminator(discriminator::Discriminator(*b"EVFUTURE"));
    w.put_bytes(correlation_id.as_bytes());
    w.into_bytes()
}
