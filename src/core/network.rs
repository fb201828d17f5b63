//! Network magic values.
//!
//! The first four header bytes identify which network a frame belongs to
//! and double as a message boundary marker in the byte stream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Networks a codec can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet3,
    Regtest,
    Simnet,
    /// Any other magic, for private networks and tests
    Custom(u32),
}

impl Network {
    /// Magic as a little-endian u32 (bytes `f9 be b4 d9` on mainnet)
    pub const fn magic(self) -> u32 {
        match self {
            Network::Mainnet => 0xd9b4_bef9,
            Network::Testnet3 => 0x0709_110b,
            Network::Regtest => 0xdab5_bfda,
            Network::Simnet => 0x1214_1c16,
            Network::Custom(magic) => magic,
        }
    }

    pub const fn magic_bytes(self) -> [u8; 4] {
        self.magic().to_le_bytes()
    }

    /// Map a magic value back to a known network, falling back to `Custom`
    pub fn from_magic(magic: u32) -> Self {
        [
            Network::Mainnet,
            Network::Testnet3,
            Network::Regtest,
            Network::Simnet,
        ]
        .into_iter()
        .find(|n| n.magic() == magic)
        .unwrap_or(Network::Custom(magic))
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Testnet3 => f.write_str("testnet3"),
            Network::Regtest => f.write_str("regtest"),
            Network::Simnet => f.write_str("simnet"),
            Network::Custom(magic) => write!(f, "custom({magic:#010x})"),
        }
    }
}
