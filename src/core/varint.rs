//! # Variable-length integers
//!
//! CompactSize encoding used to prefix every list and string on the wire:
//!
//! ```text
//! value < 0xfd          -> [value]
//! value <= 0xffff       -> [0xfd] u16 LE
//! value <= 0xffff_ffff  -> [0xfe] u32 LE
//! otherwise             -> [0xff] u64 LE
//! ```
//!
//! Encoders always pick the narrowest class. Decoders reject anything
//! wider than necessary so that a given value has exactly one encoding.

use crate::core::wire::WireReader;
use crate::error::{Result, WireError};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

/// Largest encoded width of a varint
pub const MAX_VARINT_SIZE: usize = 9;

const MARKER_U16: u8 = 0xfd;
const MARKER_U32: u8 = 0xfe;
const MARKER_U64: u8 = 0xff;

/// Number of bytes `value` occupies once encoded
pub const fn varint_len(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Encode `value` in its minimal width class.
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(varint_len(value));
    // Vec sinks never fail.
    let _ = write_varint(&mut out, value);
    out
}

/// Write `value` in its minimal width class.
///
/// # Errors
/// `WireError::WriteError` if the sink fails.
pub fn write_varint<W: Write + ?Sized>(writer: &mut W, value: u64) -> Result<()> {
    let res = match value {
        0..=0xfc => writer.write_u8(value as u8),
        0xfd..=0xffff => writer
            .write_u8(MARKER_U16)
            .and_then(|_| writer.write_u16::<LittleEndian>(value as u16)),
        0x1_0000..=0xffff_ffff => writer
            .write_u8(MARKER_U32)
            .and_then(|_| writer.write_u32::<LittleEndian>(value as u32)),
        _ => writer
            .write_u8(MARKER_U64)
            .and_then(|_| writer.write_u64::<LittleEndian>(value)),
    };
    res.map_err(WireError::write("varint"))
}

/// Decode a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize)> {
    let mut reader = WireReader::new(buf);
    let value = reader.read_varint()?;
    Ok((value, reader.position()))
}

impl<'a> WireReader<'a> {
    /// Read a canonical varint.
    ///
    /// # Errors
    /// - `UnexpectedEof` when not even the marker byte is present
    /// - `MalformedVarInt` when the marker's trailing bytes are missing
    /// - `NonCanonicalVarInt` when a narrower class would have sufficed
    pub fn read_varint(&mut self) -> Result<u64> {
        let start = self.offset();
        let marker = self.read_u8("varint")?;

        let (width, min) = match marker {
            MARKER_U16 => (2usize, 0xfdu64),
            MARKER_U32 => (4, 0x1_0000),
            MARKER_U64 => (8, 0x1_0000_0000),
            small => return Ok(u64::from(small)),
        };

        if self.remaining() < width {
            return Err(WireError::MalformedVarInt {
                offset: start,
                marker,
                needed: width,
                available: self.remaining(),
            });
        }

        let value = match width {
            2 => u64::from(self.read_u16_le("varint")?),
            4 => u64::from(self.read_u32_le("varint")?),
            _ => self.read_u64_le("varint")?,
        };

        if value < min {
            return Err(WireError::NonCanonicalVarInt {
                offset: start,
                marker,
                value,
                min,
            });
        }

        Ok(value)
    }

    /// Read a varint element count and check it against `max` before any
    /// allocation sized by it happens.
    pub fn read_count(&mut self, max: u64, field: &'static str) -> Result<usize> {
        let offset = self.offset();
        let count = self.read_varint()?;
        if count > max {
            return Err(WireError::TooManyElements {
                field,
                offset,
                count,
                max,
            });
        }
        Ok(count as usize)
    }

    /// Read a varint-prefixed byte string of at most `max` bytes.
    pub fn read_var_bytes(&mut self, max: usize, field: &'static str) -> Result<&'a [u8]> {
        let len = self.read_count(max as u64, field)?;
        self.read_slice(len, field)
    }

    /// Read a varint-prefixed UTF-8 string of at most `max` bytes.
    pub fn read_var_string(&mut self, max: usize, field: &'static str) -> Result<String> {
        let offset = self.offset();
        let bytes = self.read_var_bytes(max, field)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| WireError::InvalidEncoding {
            field,
            reason: format!("invalid utf-8 at offset {offset}: {e}"),
        })
    }
}

/// Write a varint length prefix followed by `bytes`.
pub fn write_var_bytes<W: Write + ?Sized>(
    writer: &mut W,
    bytes: &[u8],
    field: &'static str,
) -> Result<()> {
    write_varint(writer, bytes.len() as u64)?;
    writer.write_all(bytes).map_err(WireError::write(field))
}

/// Write a varint-prefixed UTF-8 string.
pub fn write_var_string<W: Write + ?Sized>(
    writer: &mut W,
    value: &str,
    field: &'static str,
) -> Result<()> {
    write_var_bytes(writer, value.as_bytes(), field)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn boundary_values_use_minimal_width() {
        let cases: &[(u64, &[u8])] = &[
            (0, &[0x00]),
            (0xfc, &[0xfc]),
            (0xfd, &[0xfd, 0xfd, 0x00]),
            (0xffff, &[0xfd, 0xff, 0xff]),
            (0x1_0000, &[0xfe, 0x00, 0x00, 0x01, 0x00]),
            (0xffff_ffff, &[0xfe, 0xff, 0xff, 0xff, 0xff]),
            (
                0x1_0000_0000,
                &[0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00],
            ),
            (
                u64::MAX,
                &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
            ),
        ];

        for (value, wire) in cases {
            assert_eq!(encode_varint(*value), *wire, "encode {value:#x}");
            assert_eq!(varint_len(*value), wire.len());
            let (decoded, used) = decode_varint(wire).unwrap();
            assert_eq!(decoded, *value);
            assert_eq!(used, wire.len());
        }
    }

    #[test]
    fn wide_marker_with_small_value_is_rejected() {
        let non_canonical: &[&[u8]] = &[
            &[0xfd, 0xfc, 0x00],
            &[0xfe, 0xff, 0xff, 0x00, 0x00],
            &[0xff, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00],
        ];
        for wire in non_canonical {
            let err = decode_varint(wire).unwrap_err();
            assert!(
                matches!(err, WireError::NonCanonicalVarInt { offset: 0, .. }),
                "{wire:02x?} -> {err:?}"
            );
        }
    }

    #[test]
    fn truncated_wide_varint_is_malformed() {
        let err = decode_varint(&[0xfe, 0x01, 0x02]).unwrap_err();
        match err {
            WireError::MalformedVarInt {
                marker,
                needed,
                available,
                ..
            } => {
                assert_eq!(marker, 0xfe);
                assert_eq!(needed, 4);
                assert_eq!(available, 2);
            }
            other => unreachable!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_eof() {
        assert!(matches!(
            decode_varint(&[]),
            Err(WireError::UnexpectedEof { field: "varint", .. })
        ));
    }

    #[test]
    fn count_over_limit_fails_before_reading_elements() {
        let wire = encode_varint(50_001);
        let mut r = WireReader::new(&wire);
        let err = r.read_count(50_000, "inv.count").unwrap_err();
        assert!(matches!(
            err,
            WireError::TooManyElements {
                count: 50_001,
                max: 50_000,
                ..
            }
        ));
    }

    #[test]
    fn var_string_roundtrip_and_limit() {
        let mut out = Vec::new();
        write_var_string(&mut out, "/Satoshi:0.7.2/", "user_agent").unwrap();
        assert_eq!(out[0], 15);

        let mut r = WireReader::new(&out);
        assert_eq!(r.read_var_string(256, "user_agent").unwrap(), "/Satoshi:0.7.2/");

        let mut r = WireReader::new(&out);
        assert!(matches!(
            r.read_var_string(8, "user_agent"),
            Err(WireError::TooManyElements { .. })
        ));
    }

    #[test]
    fn var_string_rejects_invalid_utf8() {
        let mut r = WireReader::new(&[0x02, 0xc3, 0x28]);
        assert!(matches!(
            r.read_var_string(16, "user_agent"),
            Err(WireError::InvalidEncoding { .. })
        ));
    }
}
