//! Protocol versions and the per-connection capability table.
//!
//! Peers agree on the lower of their two versions during the handshake.
//! [`Capabilities`] turns that number into the set of optional fields and
//! commands the connection may use; it is computed once and passed to
//! every encode and decode call for that connection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A negotiated protocol version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(pub u32);

impl ProtocolVersion {
    /// Oldest version this codec will frame
    pub const MIN: Self = Self(209);
    /// BIP 31: ping carries a nonce, pong exists above this version
    pub const BIP0031: Self = Self(60000);
    /// BIP 35: `mempool` message
    pub const BIP0035: Self = Self(60002);
    /// BIP 37: `relay` flag in `version`
    pub const BIP0037: Self = Self(70001);
    /// BIP 130: `sendheaders`
    pub const SEND_HEADERS: Self = Self(70012);
    /// BIP 133: `feefilter`
    pub const FEE_FILTER: Self = Self(70013);
    /// Highest version this codec speaks
    pub const LATEST: Self = Self::FEE_FILTER;

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Version both sides can speak
    pub fn negotiate(self, remote: ProtocolVersion) -> ProtocolVersion {
        self.min(remote)
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::LATEST
    }
}

impl From<u32> for ProtocolVersion {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optional wire features enabled at a given protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    version: ProtocolVersion,
    /// `ping` carries a nonce (strictly above BIP 31)
    pub ping_nonce: bool,
    /// `version` ends with a relay flag
    pub relay_flag: bool,
}

impl Capabilities {
    pub fn for_version(version: ProtocolVersion) -> Self {
        Self {
            version,
            ping_nonce: version > ProtocolVersion::BIP0031,
            relay_flag: version >= ProtocolVersion::BIP0037,
        }
    }

    /// Capabilities for the version two peers agree on
    pub fn negotiated(local: ProtocolVersion, remote: ProtocolVersion) -> Self {
        Self::for_version(local.negotiate(remote))
    }

    pub fn latest() -> Self {
        Self::for_version(ProtocolVersion::LATEST)
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Whether something introduced at `min` may be used
    pub fn supports(&self, min: ProtocolVersion) -> bool {
        self.version >= min
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::latest()
    }
}
