//! # Content hashes
//!
//! 32-byte identifiers for blocks and transactions.
//!
//! Bytes are stored in wire order (little-endian). The human-readable
//! form is the byte-reversed hex string, which is what block explorers
//! and RPC interfaces print:
//!
//! ```text
//! wire:    6fe28c0ab6f1b372c1a6a246ae63f74f931e8365e15a089c68d6190000000000
//! display: 000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f
//! ```
//!
//! The reversal is a presentation transform only; nothing else in the
//! crate ever looks at the reversed order.

use crate::core::wire::{Decodable, Encodable, WireReader};
use crate::error::{Result, WireError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Size of a content hash in bytes
pub const HASH_SIZE: usize = 32;

/// Longest accepted display string (two hex digits per byte)
pub const MAX_HASH_STRING_SIZE: usize = HASH_SIZE * 2;

/// A 32-byte content identifier in wire byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ContentHash([u8; HASH_SIZE]);

impl ContentHash {
    /// The all-zero hash, used as the "no hash" / error sentinel.
    pub const ZERO: ContentHash = ContentHash([0u8; HASH_SIZE]);

    /// Wrap bytes that are already in wire order.
    pub const fn from_array(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build a hash from a slice in wire order.
    ///
    /// # Errors
    /// `WireError::InvalidLength` unless `bytes` is exactly 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; HASH_SIZE] = bytes.try_into().map_err(|_| WireError::InvalidLength {
            field: "hash",
            expected: HASH_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Parse the byte-reversed hex display form.
    ///
    /// Strings shorter than 64 digits are read as if left-padded with
    /// zeros, so `"1"` is the hash whose first wire byte is `0x01`.
    ///
    /// # Errors
    /// `WireError::InvalidEncoding` for empty input, more than 64 digits
    /// or any non-hex character.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(WireError::InvalidEncoding {
                field: "hash",
                reason: "empty hash string".into(),
            });
        }
        if s.len() > MAX_HASH_STRING_SIZE {
            return Err(WireError::InvalidEncoding {
                field: "hash",
                reason: format!(
                    "hash string is {} characters, maximum is {MAX_HASH_STRING_SIZE}",
                    s.len()
                ),
            });
        }

        let padded;
        let digits = if s.len() % 2 == 1 {
            padded = format!("0{s}");
            padded.as_str()
        } else {
            s
        };

        let mut reversed = [0u8; HASH_SIZE];
        let len = digits.len() / 2;
        hex::decode_to_slice(digits, &mut reversed[HASH_SIZE - len..]).map_err(|e| {
            WireError::InvalidEncoding {
                field: "hash",
                reason: format!("{e} in {s:?}"),
            }
        })?;

        reversed.reverse();
        Ok(Self(reversed))
    }

    /// SHA-256 applied twice, the network's content digest.
    pub fn double_sha256(data: &[u8]) -> Self {
        let first = Sha256::digest(data);
        Self(Sha256::digest(first).into())
    }

    /// Raw bytes in wire order
    pub const fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub const fn into_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_SIZE]
    }

    /// Exact byte-wise comparison
    pub fn is_equal(&self, other: &ContentHash) -> bool {
        self == other
    }
}

impl From<[u8; HASH_SIZE]> for ContentHash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.write_str(&hex::encode(reversed))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

impl FromStr for ContentHash {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Encodable for ContentHash {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.0).map_err(WireError::write("hash"))
    }

    fn encoded_len(&self) -> usize {
        HASH_SIZE
    }
}

impl Decodable for ContentHash {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self(reader.read_array("hash")?))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
