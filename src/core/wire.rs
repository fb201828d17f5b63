//! Offset-tracking byte reader and the encode/decode traits shared by
//! every wire structure.
//!
//! Decoding always works on a fully buffered payload: the envelope has
//! already read exactly `length` bytes, so a short read here is a
//! structural error, never a reason to wait for more input.

use crate::error::{Result, WireError};
use std::io::Write;

/// Types with a fixed or self-describing wire encoding.
pub trait Encodable {
    /// Write the wire form into `writer`.
    ///
    /// # Errors
    /// Returns `WireError::WriteError` if the sink rejects the bytes.
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()>;

    /// Exact number of bytes `encode` will write
    fn encoded_len(&self) -> usize;

    /// Convenience wrapper encoding into a fresh buffer
    fn to_wire_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        // Writing into a Vec cannot fail.
        let _ = self.encode(&mut out);
        out
    }
}

/// Types that can be read back from a [`WireReader`].
pub trait Decodable: Sized {
    /// # Errors
    /// Returns `WireError::UnexpectedEof` when the input ends early, or a
    /// type-specific structural error.
    fn decode(reader: &mut WireReader<'_>) -> Result<Self>;
}

/// Cursor over a borrowed buffer that remembers how far it has read.
///
/// `base` shifts reported offsets so errors inside a payload point at the
/// absolute position in the frame rather than the payload start.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            base: 0,
        }
    }

    /// Reader whose reported offsets start at `base`
    pub fn with_base_offset(buf: &'a [u8], base: usize) -> Self {
        Self { buf, pos: 0, base }
    }

    /// Absolute offset of the next unread byte
    #[inline]
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Bytes consumed from this reader's own buffer
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `n` bytes and advance past them.
    ///
    /// Nothing is consumed on failure.
    pub fn read_slice(&mut self, n: usize, field: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(WireError::UnexpectedEof {
                field,
                offset: self.offset(),
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N, field)?);
        Ok(out)
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        Ok(self.read_array::<1>(field)?[0])
    }

    pub fn read_bool(&mut self, field: &'static str) -> Result<bool> {
        Ok(self.read_u8(field)? != 0)
    }

    pub fn read_u16_le(&mut self, field: &'static str) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array(field)?))
    }

    pub fn read_u16_be(&mut self, field: &'static str) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array(field)?))
    }

    pub fn read_u32_le(&mut self, field: &'static str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array(field)?))
    }

    pub fn read_i32_le(&mut self, field: &'static str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array(field)?))
    }

    pub fn read_u64_le(&mut self, field: &'static str) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array(field)?))
    }

    pub fn read_i64_le(&mut self, field: &'static str) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array(field)?))
    }

    /// Unread tail of the buffer, without consuming it
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}
