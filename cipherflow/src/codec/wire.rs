//! Bounds-checked cursor helpers for the wire formats.
//!
//! Every record, event, and instruction shape in this crate is built from the
//! same two primitives: fixed-width little-endian fields and variable-length
//! fields carrying a 4-byte little-endian length prefix. [`ByteReader`] and
//! [`ByteWriter`] implement exactly those primitives so the shape modules
//! stay declarative field lists instead of repeating offset arithmetic.
//!
//! All read failures surface as [`DecodeError`]; nothing here panics on
//! malformed input.

use bytes::{Buf, BufMut};
use thiserror::Error;

use crate::codec::discriminator::Discriminator;

/// Errors produced while decoding wire shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ended before a fixed-width field.
    #[error("truncated buffer: needed {needed} bytes at offset {offset}, {remaining} remaining")]
    Truncated {
        /// Offset at which the read was attempted.
        offset: usize,
        /// Bytes the field required.
        needed: usize,
        /// Bytes actually remaining.
        remaining: usize,
    },

    /// A variable-length field declared more bytes than the buffer holds.
    #[error("variable field length {len} exceeds remaining {remaining} bytes")]
    LengthOutOfRange {
        /// Declared length.
        len: u32,
        /// Bytes actually remaining after the prefix.
        remaining: usize,
    },

    /// The leading 8-byte tag did not match the expected shape.
    #[error("unexpected discriminator {found}")]
    UnexpectedDiscriminator {
        /// Tag found in the buffer.
        found: Discriminator,
    },

    /// A status byte outside the closed status set.
    #[error("unknown status byte {0:#04x}")]
    InvalidStatus(u8),

    /// A timestamp field that does not map to a valid instant.
    #[error("timestamp {0} out of range")]
    InvalidTimestamp(i64),

    /// Bytes left over after a shape that must consume its whole buffer.
    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),

    /// A result blob whose size does not match the computation kind.
    #[error("result blob for {kind}: expected {expected} bytes, got {got}")]
    BadResultLength {
        /// Kind name, for the log line.
        kind: &'static str,
        /// Expected blob size.
        expected: usize,
        /// Actual blob size.
        got: usize,
    },
}

/// Forward-only reader over a byte slice.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < needed {
            return Err(DecodeError::Truncated {
                offset: self.offset,
                needed,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(out)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        let mut raw = self.take(4)?;
        Ok(raw.get_u32_le())
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64_le(&mut self) -> Result<u64, DecodeError> {
        let mut raw = self.take(8)?;
        Ok(raw.get_u64_le())
    }

    /// Reads a little-endian `i64`.
    pub fn read_i64_le(&mut self) -> Result<i64, DecodeError> {
        let mut raw = self.take(8)?;
        Ok(raw.get_i64_le())
    }

    /// Reads a fixed-width byte array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let raw = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(raw);
        Ok(out)
    }

    /// Reads a variable-length field: 4-byte little-endian length prefix
    /// followed by that many bytes.
    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_u32_le()?;
        if (len as usize) > self.remaining() {
            return Err(DecodeError::LengthOutOfRange {
                len,
                remaining: self.remaining(),
            });
        }
        Ok(self.take(len as usize)?.to_vec())
    }

    /// Reads and checks the leading discriminator tag.
    pub fn read_discriminator(&mut self, expected: Discriminator) -> Result<(), DecodeError> {
        let found = Discriminator(self.read_array::<8>()?);
        if found != expected {
            return Err(DecodeError::UnexpectedDiscriminator { found });
        }
        Ok(())
    }

    /// Asserts the buffer is fully consumed.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

/// Append-only writer producing the wire encoding.
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Creates a writer with the given capacity hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Appends a single byte.
    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    /// Appends a little-endian `u32`.
    pub fn put_u32_le(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    /// Appends a little-endian `u64`.
    pub fn put_u64_le(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    /// Appends a little-endian `i64`.
    pub fn put_i64_le(&mut self, v: i64) {
        self.buf.put_i64_le(v);
    }

    /// Appends raw bytes with no prefix.
    pub fn put_bytes(&mut self, v: &[u8]) {
        self.buf.put_slice(v);
    }

    /// Appends a variable-length field with its 4-byte length prefix.
    pub fn put_var_bytes(&mut self, v: &[u8]) {
        self.buf.put_u32_le(v.len() as u32);
        self.buf.put_slice(v);
    }

    /// Appends an 8-byte discriminator tag.
    pub fn put_discriminator(&mut self, d: Discriminator) {
        self.buf.put_slice(&d.0);
    }

    /// Consumes the writer, yielding the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::discriminator;

    #[test]
    fn round_trip_fixed_fields() {
        let mut w = ByteWriter::with_capacity(32);
        w.put_u8(7);
        w.put_u32_le(0xDEAD_BEEF);
        w.put_u64_le(42);
        w.put_i64_le(-5);
        let bytes = w.into_bytes();

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u32_le().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.read_u64_le().unwrap(), 42);
        assert_eq!(r.read_i64_le().unwrap(), -5);
        r.finish().unwrap();
    }

    #[test]
    fn round_trip_var_bytes() {
        let mut w = ByteWriter::with_capacity(16);
        w.put_var_bytes(b"hello");
        let bytes = w.into_bytes();

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_var_bytes().unwrap(), b"hello");
        r.finish().unwrap();
    }

    #[test]
    fn truncated_fixed_field_is_error() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        let err = r.read_u64_le().unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { needed: 8, .. }));
    }

    #[test]
    fn var_length_beyond_buffer_is_error() {
        // Length prefix claims 100 bytes, only 2 follow
        let mut w = ByteWriter::with_capacity(8);
        w.put_u32_le(100);
        w.put_bytes(&[1, 2]);
        let bytes = w.into_bytes();

        let mut r = ByteReader::new(&bytes);
        let err = r.read_var_bytes().unwrap_err();
        assert!(matches!(err, DecodeError::LengthOutOfRange { len: 100, .. }));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        assert_eq!(r.read_u8().unwrap(), 1);
        let err = r.finish().unwrap_err();
        assert_eq!(err, DecodeError::TrailingBytes(2));
    }

    #[test]
    fn wrong_discriminator_is_error() {
        let mut w = ByteWriter::with_capacity(8);
        w.put_discriminator(discriminator::CALLBACK_RESULT);
        let bytes = w.into_bytes();

        let mut r = ByteReader::new(&bytes);
        let err = r
            .read_discriminator(discriminator::COMPUTATION_REQUEST)
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedDiscriminator { .. }));
    }
}
