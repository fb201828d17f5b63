//! # Message Envelope
//!
//! The fixed 24-byte header that precedes every payload on the wire.
//!
//! ```text
//! +-----------+--------------+----------------+--------------+
//! | magic (4) | command (12) | length (4, LE) | checksum (4) |
//! +-----------+--------------+----------------+--------------+
//! | payload (length bytes)                             ...   |
//! +----------------------------------------------------------+
//! ```
//!
//! ## Responsibilities
//! - Parse and serialize the header fields
//! - Compute length and checksum for an outgoing payload
//! - Verify the checksum of an incoming payload
//!
//! Deciding whether the command is acceptable and whether the length is
//! within limits belongs to [`Codec`](crate::protocol::codec::Codec),
//! which knows the registry and the configured maximum.

use crate::core::command::{command_name, Command, COMMAND_SIZE};
use crate::core::network::Network;
use crate::core::wire::WireReader;
use crate::error::{Result, WireError};
use crate::utils::checksum::{Checksum, CHECKSUM_SIZE};

/// Total size of the fixed-length header
pub const HEADER_SIZE: usize = 4 + COMMAND_SIZE + 4 + CHECKSUM_SIZE;

/// Decoded message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageEnvelope {
    pub magic: u32,
    pub command: [u8; COMMAND_SIZE],
    pub length: u32,
    pub checksum: [u8; CHECKSUM_SIZE],
}

impl MessageEnvelope {
    /// Build the header for an outgoing payload.
    ///
    /// # Errors
    /// `PayloadTooLarge` if the payload cannot be described by a u32 length.
    pub fn for_payload(
        network: Network,
        command: Command,
        payload: &[u8],
        checksum: &dyn Checksum,
    ) -> Result<Self> {
        let length = u32::try_from(payload.len()).map_err(|_| WireError::PayloadTooLarge {
            command: command.to_string(),
            length: payload.len(),
            max: u32::MAX as usize,
        })?;

        Ok(Self {
            magic: network.magic(),
            command: command.to_field(),
            length,
            checksum: checksum.checksum(payload),
        })
    }

    /// Parse a header from the front of `buf`.
    ///
    /// # Errors
    /// `UnexpectedEof` when fewer than [`HEADER_SIZE`] bytes are available.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(buf);
        if reader.remaining() < HEADER_SIZE {
            return Err(WireError::UnexpectedEof {
                field: "header",
                offset: 0,
                needed: HEADER_SIZE,
                available: reader.remaining(),
            });
        }

        Ok(Self {
            magic: reader.read_u32_le("header.magic")?,
            command: reader.read_array("header.command")?,
            length: reader.read_u32_le("header.length")?,
            checksum: reader.read_array("header.checksum")?,
        })
    }

    /// Serialize the header
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..16].copy_from_slice(&self.command);
        out[16..20].copy_from_slice(&self.length.to_le_bytes());
        out[20..24].copy_from_slice(&self.checksum);
        out
    }

    #[inline]
    pub fn payload_len(&self) -> usize {
        self.length as usize
    }

    /// Command name for diagnostics, lossy for malformed fields
    pub fn command_label(&self) -> String {
        match command_name(&self.command) {
            Ok(name) => name.to_string(),
            Err(_) => String::from_utf8_lossy(&self.command)
                .trim_end_matches('\0')
                .to_string(),
        }
    }

    /// Check `payload` against the header's checksum.
    ///
    /// # Errors
    /// `ChecksumMismatch` carrying both values.
    pub fn verify(&self, payload: &[u8], checksum: &dyn Checksum) -> Result<()> {
        let actual = checksum.checksum(payload);
        if actual != self.checksum {
            return Err(WireError::ChecksumMismatch {
                command: self.command_label(),
                expected: self.checksum,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::utils::checksum::DoubleSha256;

    #[test]
    fn verack_header_bytes() {
        let env =
            MessageEnvelope::for_payload(Network::Mainnet, Command::Verack, &[], &DoubleSha256)
                .unwrap();
        let bytes = env.to_bytes();
        assert_eq!(
            bytes.to_vec(),
            [
                0xf9, 0xbe, 0xb4, 0xd9, // magic
                b'v', b'e', b'r', b'a', b'c', b'k', 0, 0, 0, 0, 0, 0, // command
                0, 0, 0, 0, // length
                0x5d, 0xf6, 0xe0, 0xe2, // checksum
            ]
            .to_vec()
        );
        assert_eq!(MessageEnvelope::from_bytes(&bytes).unwrap(), env);
    }

    #[test]
    fn truncated_header() {
        let err = MessageEnvelope::from_bytes(&[0xf9, 0xbe, 0xb4]).unwrap_err();
        assert!(matches!(
            err,
            WireError::UnexpectedEof {
                field: "header",
                needed: HEADER_SIZE,
                available: 3,
                ..
            }
        ));
    }

    #[test]
    fn verify_detects_corruption() {
        let payload = b"\x01\x02\x03".to_vec();
        let env =
            MessageEnvelope::for_payload(Network::Regtest, Command::Inv, &payload, &DoubleSha256)
                .unwrap();
        env.verify(&payload, &DoubleSha256).unwrap();

        let mut corrupted = payload.clone();
        corrupted[1] ^= 0x80;
        match env.verify(&corrupted, &DoubleSha256) {
            Err(WireError::ChecksumMismatch { command, .. }) => assert_eq!(command, "inv"),
            other => unreachable!("unexpected {other:?}"),
        }
    }

    #[test]
    fn label_survives_garbage() {
        let mut env =
            MessageEnvelope::for_payload(Network::Mainnet, Command::Ping, &[], &DoubleSha256)
                .unwrap();
        env.command[8] = b'!';
        assert!(env.command_label().starts_with("ping"));
    }
}
