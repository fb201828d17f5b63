//! Payload checksums for the message header.
//!
//! The header carries a digest of the payload truncated to four bytes.
//! The digest is pluggable so test networks and tooling can supply their
//! own; the default is the first four bytes of SHA-256(SHA-256(payload)).

use sha2::{Digest, Sha256};
use std::fmt::Debug;

/// Width of the header checksum
pub const CHECKSUM_SIZE: usize = 4;

/// Digest applied to every payload before it goes on the wire.
pub trait Checksum: Send + Sync + Debug {
    fn checksum(&self, payload: &[u8]) -> [u8; CHECKSUM_SIZE];
}

/// Double SHA-256, truncated
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleSha256;

impl Checksum for DoubleSha256 {
    fn checksum(&self, payload: &[u8]) -> [u8; CHECKSUM_SIZE] {
        let digest = Sha256::digest(Sha256::digest(payload));
        let mut out = [0u8; CHECKSUM_SIZE];
        out.copy_from_slice(&digest[..CHECKSUM_SIZE]);
        out
    }
}
